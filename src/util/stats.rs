use std::fmt::Display;

/// Running summary of integer samples.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stats {
    pub count: usize,
    pub min: usize,
    pub max: usize,
    pub total: usize,
}

impl Stats {
    pub fn add_sample(&mut self, value: usize) {
        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.total += value;
    }

    pub fn merge(&self, other: &Self) -> Self {
        Stats {
            count: self.count + other.count,
            min: self.min.min(other.min),
            max: self.max.max(other.max),
            total: self.total + other.total,
        }
    }

    pub fn avg(&self) -> f32 {
        if self.count == 0 {
            0.0
        } else {
            self.total as f32 / self.count as f32
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Stats {
            count: 0,
            min: usize::MAX,
            max: 0,
            total: 0,
        }
    }
}

impl FromIterator<usize> for Stats {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        let mut stats = Stats::default();
        iter.into_iter().for_each(|value| stats.add_sample(value));
        stats
    }
}

impl Display for Stats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            return write!(f, "no samples");
        }
        write!(
            f,
            "{} - {}; avg {:.1}; {} samples",
            self.min,
            self.max,
            self.avg(),
            self.count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::assert;

    #[test]
    fn add_sample() {
        let mut s = Stats::default();
        s.add_sample(20);
        s.add_sample(10);
        assert!(s.count == 2);
        assert!(s.min == 10);
        assert!(s.max == 20);
        assert!(s.avg() == 15.0);
    }

    #[test]
    fn merge_stats() {
        let a: Stats = [10].into_iter().collect();
        let b: Stats = [30, 50].into_iter().collect();
        let m = a.merge(&b);
        assert!(m.count == 3);
        assert!(m.min == 10);
        assert!(m.max == 50);
        assert!(m.avg() == 30.0);
    }

    #[test]
    fn merge_with_default() {
        let s: Stats = [5].into_iter().collect();
        assert!(Stats::default().merge(&s) == s);
        assert!(Stats::default().merge(&Stats::default()) == Stats::default());
    }

    #[test]
    fn display_format() {
        let s: Stats = [42].into_iter().collect();
        let output = format!("{}", s);
        assert!(output == "42 - 42; avg 42.0; 1 samples");
        assert!(format!("{}", Stats::default()) == "no samples");
    }
}
