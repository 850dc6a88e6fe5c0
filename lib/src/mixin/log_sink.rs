use std::fmt::{Debug, Display, Error as FmtError, Formatter};
use std::rc::Rc;

/// Destination for the progress messages of a mixin session
///
/// By default messages go to the `log` crate at `info` level.
#[derive(Clone)]
pub struct LogSink {
    name: String,
    sink: Rc<dyn Fn(&str)>,
}

impl LogSink {
    /// Make a named sink (the name is only used to describe the sink)
    pub fn new(name: impl Into<String>, sink: impl Fn(&str) + 'static) -> LogSink {
        LogSink {
            name: name.into(),
            sink: Rc::new(sink),
        }
    }

    pub fn log(&self, message: &str) {
        (self.sink)(message)
    }
}

impl Default for LogSink {
    fn default() -> LogSink {
        LogSink::new("log::info", |message| log::info!("{}", message))
    }
}

impl Display for LogSink {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.write_str(&self.name)
    }
}

impl Debug for LogSink {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        write!(f, "LogSink({})", self.name)
    }
}
