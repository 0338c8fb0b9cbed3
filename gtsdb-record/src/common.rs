//! Common imports from external crates.

pub use anyhow::{bail, ensure, format_err, Context, Result};
pub use bbox::{Rect, HW, TLBR};
pub use futures::stream::{self, StreamExt, TryStreamExt};
pub use itertools::Itertools;
pub use log::{debug, info, warn};
pub use once_cell::sync::Lazy;
pub use par_stream::ParStreamExt;
pub use rand::{prelude::*, rngs::StdRng, seq::SliceRandom};
pub use regex::Regex;
pub use serde::{Deserialize, Serialize};
pub use std::{
    collections::{HashMap, HashSet},
    fmt::{self, Display},
    fs::{self, File},
    io::{self, BufReader, BufWriter},
    num::NonZeroUsize,
    ops::Range,
    path::{Path, PathBuf},
    sync::Arc,
};
pub use tfrecord::{Example, ExampleIter, ExampleWriter, Feature};
