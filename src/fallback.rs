/// Holds the last good value of a computation which sometimes can't produce one
/// (zero elapsed time, empty search range). Reads fall back to `default`
/// until the first good value arrives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LastKnownGood<T> {
    value: Option<T>,
    default: T,
}

impl<T: Copy> LastKnownGood<T> {
    pub fn new(default: T) -> Self {
        Self { value: None, default }
    }

    pub fn with_value(value: T, default: T) -> Self {
        Self { value: Some(value), default }
    }

    /// Store `candidate` if there is one, otherwise keep what we had
    pub fn update(&mut self, candidate: Option<T>) -> T {
        if let Some(v) = candidate {
            self.value = Some(v);
        }
        self.get()
    }

    pub fn get(&self) -> T {
        self.value.unwrap_or(self.default)
    }
}

/// ------------------------------------------------------------------------------------------------
/// Module unit tests
/// ------------------------------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback() {
        let mut cell = LastKnownGood::new(180.0);
        assert_eq!(cell.get(), 180.0);
        assert_eq!(cell.update(None), 180.0);
        assert_eq!(cell.update(Some(25.0)), 25.0);
        assert_eq!(cell.update(None), 25.0);
    }
}
