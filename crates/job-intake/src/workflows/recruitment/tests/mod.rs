mod common;
mod compose;
mod files;
mod pipeline;
