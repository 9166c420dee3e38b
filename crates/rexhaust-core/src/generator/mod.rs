//! Regexp and input-string enumerators.

mod regexp;
mod rng;
mod string;
mod template;

pub use regexp::{GeneratorError, RegexpGenerator};
pub use rng::XorShift64;
pub use string::StringGenerator;
pub use template::{Template, TemplateError};
