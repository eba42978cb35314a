// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors from the collaborators of a [`super::BlockProcessor`].

use thiserror::Error;

use crate::ShapeMismatch;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Block {block} is not available")]
    NoBlock { block: usize },

    #[error("The voltage reading thread panicked")]
    Panicked,

    #[error(transparent)]
    Shape(#[from] ShapeMismatch),

    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum DelayError {
    #[error("No delays are available for block {block}")]
    NoBlock { block: usize },

    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
