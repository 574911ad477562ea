//! The client's input surface.
//!
//! The windowing layer (out of scope here) fills this struct each frame;
//! the loop turns it into world-space movement and combat requests. Combat
//! actions are edge-triggered booleans; movement keys are level-triggered.

use glam::Vec3;

#[derive(Debug, Clone, Copy, Default)]
pub struct InputState {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub sprint: bool,

    pub light_attack: bool,
    pub heavy_attack: bool,
    pub parry: bool,
    pub dodge: bool,
    pub respawn: bool,

    /// Look yaw in radians; zero faces -Z
    pub yaw: f32,
    /// Look pitch in radians, positive up
    pub pitch: f32,
}

impl InputState {
    /// Horizontal forward vector from the yaw
    pub fn forward_dir(&self) -> Vec3 {
        Vec3::new(-self.yaw.sin(), 0.0, -self.yaw.cos())
    }

    /// Full look direction including pitch
    pub fn facing(&self) -> Vec3 {
        let (sp, cp) = (self.pitch.sin(), self.pitch.cos());
        let f = self.forward_dir();
        Vec3::new(f.x * cp, sp, f.z * cp).normalize_or_zero()
    }

    /// Normalized wish direction on the XZ plane, zero when no key is held
    pub fn wish_dir(&self) -> Vec3 {
        let fwd = self.forward_dir();
        let right = Vec3::new(-fwd.z, 0.0, fwd.x);
        let mut dir = Vec3::ZERO;
        if self.forward {
            dir += fwd;
        }
        if self.back {
            dir -= fwd;
        }
        if self.right {
            dir += right;
        }
        if self.left {
            dir -= right;
        }
        if dir.length() > 0.001 {
            dir.normalize()
        } else {
            Vec3::ZERO
        }
    }
}
