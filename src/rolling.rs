/// Bounded, insertion-ordered series of samples.
///
/// Ring buffer over a `Vec<f64>`: while the buffer is not full, samples are pushed at the end;
/// once `capacity` samples are stored, each push overwrites the oldest one and moves `head`.
/// `capacity == None` never evicts.
#[derive(Debug, Clone)]
pub struct RollingSeries {
    data: Vec<f64>,
    head: usize,
    capacity: Option<usize>,
}

impl RollingSeries {
    /// `Some(0)` would drop every sample, the CLI maps a zero window to `None` before this.
    pub fn new(capacity: Option<usize>) -> Self {
        let data = match capacity {
            Some(c) => Vec::with_capacity(c),
            None => Vec::new(),
        };
        RollingSeries {
            data,
            head: 0,
            capacity,
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn push(&mut self, v: f64) {
        match self.capacity {
            Some(0) => {}
            Some(c) if self.data.len() == c => {
                self.data[self.head] = v;
                self.head = (self.head + 1) % c;
            }
            _ => self.data.push(v),
        }
    }

    /// most recently inserted sample
    pub fn last(&self) -> Option<f64> {
        self.iter().next_back()
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.head = 0;
    }

    /// iterates from the oldest to the newest sample
    pub fn iter(&self) -> RollingIter<'_> {
        RollingIter {
            series: self,
            current: 0,
            current_back: self.data.len(),
        }
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.iter().collect()
    }

    /// maps a logical position (0 = oldest) to the slot in `data`
    fn at(&self, pos: usize) -> f64 {
        let len = self.data.len();
        self.data[(self.head + pos) % len]
    }
}

/// produces the retained samples in insertion order
#[derive(Clone, Debug)]
pub struct RollingIter<'a> {
    series: &'a RollingSeries,
    current: usize,
    current_back: usize,
}

impl<'a> Iterator for RollingIter<'a> {
    type Item = f64;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current >= self.current_back {
            return None;
        }
        let result = self.series.at(self.current);
        self.current += 1;
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let l = self.current_back - self.current;
        (l, Some(l))
    }
}

impl<'a> DoubleEndedIterator for RollingIter<'a> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.current >= self.current_back {
            return None;
        }
        self.current_back -= 1;
        Some(self.series.at(self.current_back))
    }
}

impl<'a> ExactSizeIterator for RollingIter<'a> {}

impl<'a> IntoIterator for &'a RollingSeries {
    type Item = f64;
    type IntoIter = RollingIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
