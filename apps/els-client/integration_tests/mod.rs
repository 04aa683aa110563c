mod bridge;
mod helpers;
mod lifecycle;
