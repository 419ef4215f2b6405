use super::test_helpers::{
    FakeExtractor, LEAKY_DETAIL, SOURCE_URL, create_test_downloader, create_test_downloader_with,
    descriptor_with_heights, wait_for_status,
};
use super::*;
use crate::error::{
    MSG_DOWNLOAD_FAILED, MSG_INVALID_SOURCE, MSG_URL_REQUIRED, ResolveError, ToHttpStatus,
};
use crate::types::{Event, TaskId, TaskStatus};
use std::sync::atomic::Ordering;
use std::time::Duration;
