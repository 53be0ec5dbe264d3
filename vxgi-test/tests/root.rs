mod materials;
mod peel;
mod scene;
mod sweep;
