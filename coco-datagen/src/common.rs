pub use anyhow::{bail, ensure, format_err, Context as _, Result};
pub use indexmap::IndexMap;
pub use itertools::Itertools as _;
pub use log::{info, warn};
pub use ndarray::{s, Array1, Array2, Array3, Array4, Axis};
pub use rand::prelude::*;
pub use serde::{Deserialize, Deserializer, Serialize};
pub use std::{
    collections::HashMap,
    fmt::Debug,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};
