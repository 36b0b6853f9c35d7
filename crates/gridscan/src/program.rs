//! Shader program compilation and the cached uniform location table.
//!
//! Both stages go through naga's GLSL front end before the device sees them,
//! so syntax and type errors surface as [`GridScanError::ShaderCompile`]
//! instead of a validation panic deep inside pipeline creation. The fragment
//! stage's uniform block is reflected once; per-frame uploads only touch the
//! cached offsets.

use std::collections::BTreeMap;

use tracing::debug;
use wgpu::naga;

use crate::backend::{GpuDevice, ProgramId, ProgramSource};
use crate::error::{GridScanError, ShaderStageKind};
use crate::uniforms::{UniformId, UniformKind, UniformState};

/// Full-screen triangle vertex stage.
pub const VERTEX_SHADER: &str = include_str!("../shaders/fullscreen.vert");
/// Grid and scan band fragment stage.
pub const FRAGMENT_SHADER: &str = include_str!("../shaders/gridscan.frag");

/// Byte location of one member inside the uniform block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformLocation {
    pub offset: u32,
    pub kind: UniformKind,
}

/// Reflected std140 uniform block at set 0, binding 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniformLayout {
    members: BTreeMap<String, UniformLocation>,
    size: u64,
}

impl UniformLayout {
    pub fn get(&self, name: &str) -> Option<UniformLocation> {
        self.members.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Block size rounded up to a multiple of 16 bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }
}

fn parse_stage(stage: ShaderStageKind, source: &str) -> Result<naga::Module, GridScanError> {
    let naga_stage = match stage {
        ShaderStageKind::Vertex => naga::ShaderStage::Vertex,
        ShaderStageKind::Fragment => naga::ShaderStage::Fragment,
    };
    let mut frontend = naga::front::glsl::Frontend::default();
    let module = frontend
        .parse(&naga::front::glsl::Options::from(naga_stage), source)
        .map_err(|err| GridScanError::ShaderCompile {
            stage,
            message: err.to_string(),
        })?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|err| GridScanError::ShaderCompile {
        stage,
        message: err.to_string(),
    })?;
    Ok(module)
}

fn member_kind(module: &naga::Module, ty: naga::Handle<naga::Type>) -> Option<UniformKind> {
    use naga::{ScalarKind, TypeInner, VectorSize};

    match module.types[ty].inner {
        TypeInner::Scalar(scalar) if scalar.width == 4 => match scalar.kind {
            ScalarKind::Float => Some(UniformKind::Float),
            ScalarKind::Sint => Some(UniformKind::Int),
            _ => None,
        },
        TypeInner::Vector { size, scalar } if scalar.kind == ScalarKind::Float => match size {
            VectorSize::Bi => Some(UniformKind::Vec2),
            VectorSize::Tri => Some(UniformKind::Vec3),
            VectorSize::Quad => None,
        },
        TypeInner::Array {
            base,
            size: naga::ArraySize::Constant(len),
            ..
        } => match module.types[base].inner {
            TypeInner::Vector {
                size: VectorSize::Quad,
                scalar,
            } if scalar.kind == ScalarKind::Float => Some(UniformKind::Vec4Array(len.get() as usize)),
            _ => None,
        },
        _ => None,
    }
}

fn reflect_module(module: &naga::Module) -> Result<UniformLayout, GridScanError> {
    let block = module.global_variables.iter().find_map(|(_, var)| {
        let at_zero = var
            .binding
            .as_ref()
            .is_some_and(|binding| binding.group == 0 && binding.binding == 0);
        (var.space == naga::AddressSpace::Uniform && at_zero).then_some(var.ty)
    });
    let Some(block) = block else {
        return Err(GridScanError::ShaderLink(
            "fragment stage declares no uniform block at set 0, binding 0".to_string(),
        ));
    };

    let naga::TypeInner::Struct { ref members, span } = module.types[block].inner else {
        return Err(GridScanError::ShaderLink(
            "uniform binding 0 is not a block".to_string(),
        ));
    };

    let mut layout = UniformLayout {
        members: BTreeMap::new(),
        size: u64::from(span).next_multiple_of(16),
    };
    for member in members {
        let Some(name) = member.name.clone() else {
            continue;
        };
        match member_kind(module, member.ty) {
            Some(kind) => {
                layout.members.insert(
                    name,
                    UniformLocation {
                        offset: member.offset,
                        kind,
                    },
                );
            }
            None => debug!(member = %name, "skipping uniform member of unsupported type"),
        }
    }
    Ok(layout)
}

/// Parses `fragment` and reflects its uniform block without touching a device.
pub fn reflect_uniform_block(fragment: &str) -> Result<UniformLayout, GridScanError> {
    let module = parse_stage(ShaderStageKind::Fragment, fragment)?;
    reflect_module(&module)
}

/// A compiled vertex+fragment pair and its uniform location table.
#[derive(Debug)]
pub struct ShaderProgram {
    id: Option<ProgramId>,
    layout: UniformLayout,
    locations: [Option<UniformLocation>; UniformId::COUNT],
}

impl ShaderProgram {
    /// Validates both stages, reflects the uniform block and asks the device
    /// for a program.
    pub fn compile<D: GpuDevice>(
        device: &mut D,
        vertex: &str,
        fragment: &str,
    ) -> Result<Self, GridScanError> {
        parse_stage(ShaderStageKind::Vertex, vertex)?;
        let fragment_module = parse_stage(ShaderStageKind::Fragment, fragment)?;
        let layout = reflect_module(&fragment_module)?;

        let id = device.create_program(&ProgramSource {
            label: "gridscan",
            vertex,
            fragment,
            uniform_block_size: layout.size(),
        })?;
        debug!(
            program = id.0,
            members = layout.len(),
            block_size = layout.size(),
            "compiled shader program"
        );
        Ok(Self {
            id: Some(id),
            layout,
            locations: [None; UniformId::COUNT],
        })
    }

    pub fn id(&self) -> Option<ProgramId> {
        self.id
    }

    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    pub fn location(&self, id: UniformId) -> Option<UniformLocation> {
        self.locations[id.index()]
    }

    /// Resolves each uniform's location once. Members the shader does not
    /// declare stay unbound and their writes are skipped; a member whose type
    /// disagrees with the host value is a link failure.
    pub fn bind(&mut self, ids: &[UniformId]) -> Result<usize, GridScanError> {
        let mut bound = 0;
        for &id in ids {
            match self.layout.get(id.name()) {
                Some(location) if location.kind == id.kind() => {
                    self.locations[id.index()] = Some(location);
                    bound += 1;
                }
                Some(location) => {
                    return Err(GridScanError::ShaderLink(format!(
                        "uniform {} is declared as {:?}, expected {:?}",
                        id.name(),
                        location.kind,
                        id.kind()
                    )));
                }
                None => {
                    self.locations[id.index()] = None;
                    debug!(uniform = id.name(), "uniform not declared by shader; writes skipped");
                }
            }
        }
        Ok(bound)
    }

    /// Writes every dirty uniform through its cached location. Returns the
    /// number of writes issued.
    pub fn upload<D: GpuDevice>(&self, device: &mut D, state: &mut UniformState) -> usize {
        let Some(program) = self.id else {
            return 0;
        };
        let mut written = 0;
        for id in state.take_dirty().iter() {
            if let Some(location) = self.locations[id.index()] {
                device.write_uniform(program, location.offset, state.get(id).as_bytes());
                written += 1;
            }
        }
        written
    }

    pub fn is_disposed(&self) -> bool {
        self.id.is_none()
    }

    /// Releases the GPU program. Safe to call more than once.
    pub fn dispose<D: GpuDevice>(&mut self, device: &mut D) {
        if let Some(id) = self.id.take() {
            device.release_program(id);
            debug!(program = id.0, "disposed shader program");
        }
    }
}

#[cfg(test)]
mod tests {
    use gridconfig::RenderConfig;

    use super::*;

    #[derive(Default)]
    struct RecordingDevice {
        programs: Vec<u64>,
        writes: Vec<(u32, usize)>,
        released: Vec<ProgramId>,
    }

    impl GpuDevice for RecordingDevice {
        fn configure(&mut self, _width: u32, _height: u32) {}

        fn create_program(&mut self, source: &ProgramSource<'_>) -> Result<ProgramId, GridScanError> {
            self.programs.push(source.uniform_block_size);
            Ok(ProgramId(self.programs.len() as u32))
        }

        fn write_uniform(&mut self, _program: ProgramId, offset: u32, bytes: &[u8]) {
            self.writes.push((offset, bytes.len()));
        }

        fn draw(&mut self, _program: ProgramId) -> Result<(), GridScanError> {
            Ok(())
        }

        fn release_program(&mut self, program: ProgramId) {
            self.released.push(program);
        }
    }

    #[test]
    fn shader_asset_declares_every_uniform() {
        let layout = reflect_uniform_block(FRAGMENT_SHADER).unwrap();
        for id in UniformId::ALL {
            let location = layout
                .get(id.name())
                .unwrap_or_else(|| panic!("{} missing from shader", id.name()));
            assert_eq!(location.kind, id.kind(), "{}", id.name());
        }
        assert_eq!(layout.size() % 16, 0);
    }

    #[test]
    fn grid_shading_leaves_the_post_toggle_to_post_passes() {
        let body = FRAGMENT_SHADER
            .split_once("void main()")
            .map(|(_, body)| body)
            .unwrap();
        assert!(!body.contains("uPostEnabled"));
        assert!(reflect_uniform_block(FRAGMENT_SHADER)
            .unwrap()
            .get("uPostEnabled")
            .is_some());
    }

    #[test]
    fn std140_offsets_follow_declaration_order() {
        let layout = reflect_uniform_block(FRAGMENT_SHADER).unwrap();
        assert_eq!(layout.get("iResolution").unwrap().offset, 0);
        assert_eq!(layout.get("iTime").unwrap().offset, 12);
        assert_eq!(layout.get("uLinesColor").unwrap().offset, 16);
        assert_eq!(layout.get("uScanStarts").unwrap().offset, 48);
        assert_eq!(layout.get("uScanReverse").unwrap().offset, 80);
        assert_eq!(layout.get("uLook").unwrap().offset, 112);
    }

    #[test]
    fn broken_fragment_is_a_compile_error() {
        let mut device = RecordingDevice::default();
        let err = ShaderProgram::compile(&mut device, VERTEX_SHADER, "#version 450\nvoid main() { oops }")
            .unwrap_err();
        assert!(matches!(
            err,
            GridScanError::ShaderCompile {
                stage: ShaderStageKind::Fragment,
                ..
            }
        ));
        assert!(device.programs.is_empty());
    }

    #[test]
    fn broken_vertex_is_a_compile_error() {
        let mut device = RecordingDevice::default();
        let err = ShaderProgram::compile(&mut device, "#version 450\nvoid main() {", FRAGMENT_SHADER)
            .unwrap_err();
        assert!(matches!(
            err,
            GridScanError::ShaderCompile {
                stage: ShaderStageKind::Vertex,
                ..
            }
        ));
    }

    #[test]
    fn mismatched_member_type_fails_to_bind() {
        let fragment = r"#version 450
layout(location = 0) out vec4 outColor;
layout(std140, set = 0, binding = 0) uniform Params {
    vec2 iTime;
} params;
void main() { outColor = vec4(params.iTime, 0.0, 1.0); }
";
        let mut device = RecordingDevice::default();
        let mut program = ShaderProgram::compile(&mut device, VERTEX_SHADER, fragment).unwrap();
        let err = program.bind(&[UniformId::Time]).unwrap_err();
        assert!(matches!(err, GridScanError::ShaderLink(_)));
    }

    #[test]
    fn undeclared_uniforms_are_skipped_on_upload() {
        let fragment = r"#version 450
layout(location = 0) out vec4 outColor;
layout(std140, set = 0, binding = 0) uniform Params {
    vec3 iResolution;
    float iTime;
} params;
void main() { outColor = vec4(params.iResolution.xy, params.iTime, 1.0); }
";
        let mut device = RecordingDevice::default();
        let mut program = ShaderProgram::compile(&mut device, VERTEX_SHADER, fragment).unwrap();
        assert_eq!(program.bind(&UniformId::ALL).unwrap(), 2);
        assert!(program.location(UniformId::GridScale).is_none());

        let mut state = UniformState::from_config(&RenderConfig::default());
        assert_eq!(program.upload(&mut device, &mut state), 2);
        assert_eq!(device.writes, vec![(0, 12), (12, 4)]);
    }

    #[test]
    fn upload_writes_only_dirty_uniforms() {
        let mut device = RecordingDevice::default();
        let mut program = ShaderProgram::compile(&mut device, VERTEX_SHADER, FRAGMENT_SHADER).unwrap();
        program.bind(&UniformId::ALL).unwrap();
        let mut state = UniformState::from_config(&RenderConfig::default());

        assert_eq!(program.upload(&mut device, &mut state), UniformId::COUNT);
        device.writes.clear();

        state.tick(0.25);
        assert_eq!(program.upload(&mut device, &mut state), 1);
        assert_eq!(device.writes, vec![(12, 4)]);
        assert_eq!(program.upload(&mut device, &mut state), 0);
    }

    #[test]
    fn dispose_is_idempotent() {
        let mut device = RecordingDevice::default();
        let mut program = ShaderProgram::compile(&mut device, VERTEX_SHADER, FRAGMENT_SHADER).unwrap();
        program.dispose(&mut device);
        program.dispose(&mut device);
        assert_eq!(device.released, vec![ProgramId(1)]);
        assert!(program.is_disposed());

        let mut state = UniformState::from_config(&RenderConfig::default());
        assert_eq!(program.upload(&mut device, &mut state), 0);
    }
}
