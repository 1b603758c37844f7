pub use anyhow::{anyhow, bail, Error, Result};
pub use log::{debug, error, info, trace, warn};

pub use crate::config::{self, Config};
pub use crate::error::{CodecError, InverterError};
pub use crate::options::Options;
pub use crate::utils::Utils;

pub use std::time::Duration;
