use super::test_helpers::*;
use super::*;
use crate::types::{EpisodeId, JobStatus};
use std::sync::atomic::Ordering;

mod status;
