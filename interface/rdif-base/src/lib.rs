#![no_std]

extern crate alloc;

use alloc::string::String;

#[macro_use]
mod _macro;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ErrorBase {
    #[error("No memory")]
    NoMem,
    #[error("Busy")]
    Busy,
    #[error("Bad Address: {0:#x}")]
    BadAddr(usize),
    #[error("Invalid Argument `{name}`: [{val}]")]
    InvalidArg { name: &'static str, val: String },
}

#[cfg(test)]
mod tests {
    use alloc::{format, string::ToString};

    use super::*;

    custom_type!(
        /// Test id
        TestId,
        usize,
        "{:#x}"
    );

    #[test]
    fn test_custom_type_fmt() {
        let id = TestId::from(0x20);
        assert_eq!(format!("{id:?}"), "0x20");
        assert_eq!(id.to_string(), "0x20");
        assert_eq!(usize::from(id), 0x20);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(ErrorBase::BadAddr(0x1c2_0008).to_string(), "Bad Address: 0x1c20008");
        let e = ErrorBase::InvalidArg {
            name: "clock-output-names",
            val: "2".to_string(),
        };
        assert_eq!(e.to_string(), "Invalid Argument `clock-output-names`: [2]");
    }
}
