/// Count printed with `'` between groups of three digits.
pub struct NiceInt(u64);

impl From<u64> for NiceInt {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<usize> for NiceInt {
    fn from(value: usize) -> Self {
        Self(value as u64)
    }
}

impl std::fmt::Display for NiceInt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let digits = self.0.to_string();
        let head = digits.len() % 3;
        let mut groups = Vec::with_capacity(digits.len() / 3 + 1);
        if head != 0 {
            groups.push(&digits[..head]);
        }
        groups.extend((head..digits.len()).step_by(3).map(|i| &digits[i..i + 3]));
        write!(f, "{}", groups.join("'"))
    }
}

#[cfg(test)]
mod tests {
    use super::NiceInt;

    #[test]
    fn test_delimiters() {
        assert_eq!(NiceInt::from(0u64).to_string(), "0");
        assert_eq!(NiceInt::from(999usize).to_string(), "999");
        assert_eq!(NiceInt::from(1000usize).to_string(), "1'000");
        assert_eq!(NiceInt::from(1_234_567u64).to_string(), "1'234'567");
    }
}
