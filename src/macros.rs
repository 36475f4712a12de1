// Each `line_writer()` call starts a fresh line in the log, so the macro
// itself does not append a newline.
#[cfg(not(feature = "no_logging"))]
macro_rules! log {
    ($logger:expr, $($arg:tt)*) => {{
        let _ = std::fmt::Write::write_fmt($logger.line_writer(), format_args!($($arg)*));
    }};
}
#[cfg(feature = "no_logging")]
macro_rules! log {
    ($logger:expr, $($arg:tt)*) => {{
        let _ = &$logger;
    }};
}
