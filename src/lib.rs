// Terrain collider synthesis and character movement for a walkable 3D level.
// The binary in main.rs drives this library from a winit event loop.

pub mod engine;
