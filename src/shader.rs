use bytemuck::{Pod, Zeroable};

pub const BLIT_SOURCE: &str = include_str!("blit.wgsl");

/// Vertices drawn by the blit pass.
pub const QUAD_VERTICES: u32 = 6;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ViewUniform {
    /// Clip-space half extents of the quad.
    pub scale: [f32; 2],
    pub _padding: [f32; 2],
}

impl ViewUniform {
    /// Scale that fits a `frame` sized image inside a `surface` sized target
    /// without stretching it.
    pub fn letterbox(frame: (u32, u32), surface: (u32, u32)) -> Self {
        let frame_aspect = frame.0.max(1) as f32 / frame.1.max(1) as f32;
        let surface_aspect = surface.0.max(1) as f32 / surface.1.max(1) as f32;
        let scale = if surface_aspect > frame_aspect {
            [frame_aspect / surface_aspect, 1.0]
        } else {
            [1.0, surface_aspect / frame_aspect]
        };
        Self {
            scale,
            _padding: [0.0; 2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate_wgsl(code: &str) -> Result<(), String> {
        let module = naga::front::wgsl::parse_str(code)
            .map_err(|e| format!("WGSL parse error: {:?}", e))?;

        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        validator
            .validate(&module)
            .map_err(|e| format!("WGSL validation error: {:?}", e))?;

        Ok(())
    }

    #[test]
    fn test_blit_shader_is_valid() {
        validate_wgsl(BLIT_SOURCE).unwrap();
    }

    #[test]
    fn test_uniform_layout() {
        assert_eq!(std::mem::size_of::<ViewUniform>(), 16);
    }

    #[test]
    fn test_letterbox_same_aspect_fills() {
        let view = ViewUniform::letterbox((500, 250), (1000, 500));
        assert_eq!(view.scale, [1.0, 1.0]);
    }

    #[test]
    fn test_letterbox_wider_surface_pillarboxes() {
        let view = ViewUniform::letterbox((500, 500), (1000, 500));
        assert_eq!(view.scale, [0.5, 1.0]);
    }

    #[test]
    fn test_letterbox_taller_surface_letterboxes() {
        let view = ViewUniform::letterbox((1000, 500), (1000, 1000));
        assert_eq!(view.scale, [1.0, 0.5]);
    }
}
