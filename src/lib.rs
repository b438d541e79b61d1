pub mod config;
pub mod error;
pub mod events;
pub mod flipbook;
pub mod frames;
pub mod scheduler;
pub mod snapshot;
pub mod motion {
    pub mod keyframes;
    pub mod scroll;
    pub mod spring;
}
pub mod overlay {
    pub mod beats;
    pub mod caption;
    pub mod exit;
    pub mod loading;
    pub mod nudge;
}
pub mod processing {
    pub mod blur;
    pub mod color;
    pub mod layout;
    pub mod resample;
}
pub mod render {
    pub mod canvas;
    pub mod compose;
    pub mod surface;
}
pub mod tasks {
    pub mod loader;
    pub mod viewer;
}
