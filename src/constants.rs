// Engine tuning constants - single source of truth.
//
// Both server and client read these; changing them does not require
// protocol changes.

/// World and chunk dimensions
pub mod world {
    /// Chunk side length in world units
    pub const CHUNK_SIZE: i32 = 32;
    pub const CHUNK_SIZE_F32: f32 = CHUNK_SIZE as f32;

    /// Scalar fields carry one extra sample past the high edge so meshing
    /// can interpolate across chunk boundaries.
    pub const PADDED: usize = CHUNK_SIZE as usize + 1;

    /// Working-set radii around a client's chunk (5x3x5 cuboid by default)
    pub const RADIUS_XZ: i32 = 2;
    pub const RADIUS_Y: i32 = 1;
}

/// Terrain generation
pub mod terrain {
    /// Baseline surface height
    pub const SEA_LEVEL: f32 = 24.0;
    /// Vertical span of the fBm surface displacement
    pub const AMPLITUDE: f32 = 24.0;

    pub const BASE_FREQ: f32 = 0.008;
    pub const BASE_OCTAVES: u32 = 4;
    pub const DETAIL_FREQ: f32 = 0.045;
    pub const DETAIL_OCTAVES: u32 = 3;

    /// Caves only open up below `surface - CAVE_DEPTH`
    pub const CAVE_DEPTH: f32 = 4.0;
    pub const CAVE_FREQ: f32 = 0.06;
    pub const CAVE_OCTAVES: u32 = 3;
    pub const CAVE_STRENGTH: f32 = 8.0;
    pub const CAVE_CLAMP: f32 = 4.0;

    /// Densities are clamped to +/- this before the sign flip, keeping
    /// gradients near the isosurface well conditioned.
    pub const DENSITY_CLAMP: f32 = 2.0;
}

/// Player movement
pub mod movement {
    pub const PLAYER_WIDTH: f32 = 0.6;
    pub const PLAYER_HEIGHT: f32 = 1.8;
    pub const FRICTION: f32 = 8.0;
    pub const GROUND_ACCEL: f32 = 15.0;
    pub const AIR_ACCEL: f32 = 2.5;
    pub const WALK_SPEED: f32 = 8.0;
    pub const SPRINT_MULT: f32 = 1.8;
    pub const JUMP_VEL: f32 = 8.0;
    pub const GRAVITY: f32 = -22.0;
    pub const MOUSE_SENS: f32 = 0.1;

    /// Integration sub-steps per tick
    pub const SUB_STEPS: u32 = 4;
    /// Collision resolution iterations per sub-step
    pub const RESOLVE_ITERATIONS: u32 = 4;
    /// Wish-speed multiplier while an attack is recovering
    pub const RECOVERY_SPEED_SCALE: f32 = 0.3;
}

/// Stamina pool
pub mod stamina {
    pub const MAX: f32 = 100.0;
    pub const REGEN: f32 = 15.0;
    pub const SPRINT_DRAIN: f32 = 12.0;
    pub const JUMP_COST: f32 = 10.0;
    /// Seconds after full depletion before regen resumes
    pub const DEPLETE_COOLDOWN: f32 = 1.0;
}

/// Networking
pub mod net {
    use std::time::Duration;

    pub const DEFAULT_PORT: u16 = 7777;
    pub const MAX_CLIENTS: usize = 32;
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Upper bound for a single length-prefixed frame
    pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

    /// Minimum seconds between client PlayerMove sends (20 Hz)
    pub const MOVE_INTERVAL: f32 = 0.05;
    /// Frame dt clamp for both loops
    pub const MAX_DT: f32 = 0.05;
    /// Server loop courtesy sleep so workers get cycles on small cores
    pub const SERVER_SLEEP: Duration = Duration::from_millis(1);
}

/// Day-night cycle
pub mod sky {
    use glam::Vec3;

    pub const DAY_LENGTH_SECONDS: f32 = 600.0;
    /// 0 = midnight, 0.25 = dawn, 0.5 = noon, 0.75 = dusk
    pub const START_TIME: f32 = 0.25;

    pub const NIGHT_COLOR: Vec3 = Vec3::new(0.02, 0.02, 0.08);
    pub const DAY_COLOR: Vec3 = Vec3::new(0.40, 0.65, 0.90);
    pub const SUNSET_COLOR: Vec3 = Vec3::new(0.80, 0.35, 0.10);
}
