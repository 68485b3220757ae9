mod picker;

pub use picker::pick_artifact;
