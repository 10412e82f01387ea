use std::fmt::Display;
use std::sync::{Arc, Mutex, PoisonError};

/// Captured console output, used instead of stdout in tests.
#[derive(Clone, Default, Debug)]
pub struct OutputBuffer(Arc<Mutex<String>>);

impl OutputBuffer {
    fn push(&self, msg: &str) {
        let mut buf = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        buf.push_str(msg);
        buf.push('\n');
    }

    /// Everything printed so far.
    pub fn contents(&self) -> String {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Return everything printed so far and clear the buffer.
    pub fn take(&self) -> String {
        std::mem::take(&mut *self.0.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Console output, prints to stdout or into an [`OutputBuffer`].
#[derive(Clone, Default, Debug)]
pub struct Printer {
    buffer: Option<OutputBuffer>,
}

impl Printer {
    pub fn stdout() -> Self {
        Self { buffer: None }
    }

    pub fn buffered() -> (Self, OutputBuffer) {
        let buffer = OutputBuffer::default();
        (
            Self {
                buffer: Some(buffer.clone()),
            },
            buffer,
        )
    }

    pub fn print(&self, msg: impl Display) {
        let msg = msg.to_string();
        match &self.buffer {
            None => println!("{msg}"),
            Some(buffer) => buffer.push(&msg),
        }
    }

    pub fn println(&self, msg: impl Display) {
        let msg = format!("{msg}\n");
        self.print(msg)
    }
}

pub mod style {
    use crate::ui::config;
    use crossterm::style::{Color, Stylize};
    use std::fmt::{Display, Formatter};

    const UNKNOWN_PLACEHOLDER: &str = "???";

    struct View<T: Display> {
        inner: Option<T>,
        color: Color,
    }

    impl<T: Display> Display for View<T> {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            let text = self
                .inner
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| UNKNOWN_PLACEHOLDER.to_string());

            if cfg!(feature = "int_test") || !config::current().colored {
                f.write_str(&text)
            } else {
                f.write_fmt(format_args!("{}", text.with(self.color)))
            }
        }
    }

    /// Construct structure declaration to display data of the same type (file paths, states, etc.).
    /// A display style will reset if program compile with `int_test` feature or colors are off.
    macro_rules! view_struct {
        ($name: ident, $color: expr) => {
            pub struct $name<T: Display>(View<T>);

            impl<T: Display> From<T> for $name<T> {
                fn from(value: T) -> Self {
                    Self(View {
                        inner: Some(value),
                        color: $color,
                    })
                }
            }

            impl<T: Display> From<Option<T>> for $name<T> {
                fn from(value: Option<T>) -> Self {
                    Self(View {
                        inner: value,
                        color: $color,
                    })
                }
            }

            impl<T: Display> Display for $name<T> {
                fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                    self.0.fmt(f)
                }
            }
        };
    }

    view_struct!(StateView, Color::Blue);
    view_struct!(FilePathView, Color::Green);
    view_struct!(FunctionNameView, Color::Yellow);
    view_struct!(KeywordView, Color::Magenta);
    view_struct!(InstructionView, Color::DarkGreen);
    view_struct!(ErrorView, Color::Red);
}
