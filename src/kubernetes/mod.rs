// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

mod client;
pub mod discovery;
mod fetcher;
mod files;

pub use fetcher::KubeFetcher;
