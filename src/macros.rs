//===========================================================================//

macro_rules! invalid_data {
    ($e:expr) => {
        return Err(::std::io::Error::new(::std::io::ErrorKind::InvalidData,
                                         $e))
    };
    ($fmt:expr, $($arg:tt)+) => {
        return Err(::std::io::Error::new(::std::io::ErrorKind::InvalidData,
                                         format!($fmt, $($arg)+)))
    };
}

macro_rules! fatal {
    ($code:expr) => {
        return Err($crate::error::FormatError::new($code).into())
    };
    ($code:expr, $value:expr) => {
        return Err($crate::error::FormatError::new($code)
            .with_value($value)
            .into())
    };
}

//===========================================================================//
