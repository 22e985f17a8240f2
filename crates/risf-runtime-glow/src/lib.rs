//! risf runtime (glow/OpenGL backend)
//
// This crate contains **only** the ISF shader machine runtime:
// - split/parse ISF sources and build the uniform registry
// - generate + compile/link the GPU program
// - manage render targets (default output + persistent buffers)
// - run the declared render passes every frame
//
// It does NOT contain windowing, file-dialog IO, GUI binding, or capture
// inputs. The host owns the GL context lifecycle and passes `&glow::Context`
// into every call.
#![allow(clippy::missing_safety_doc)]

use glow::HasContext;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;
use std::time::Instant;

use risf_codegen::{generate, GeneratedSource};
use risf_core::{split_directive, Header, PassDecl};
use risf_uniforms::{TextureUnits, Uniform, UniformRegistry};

pub use risf_codegen::{FRAGMENT_TEMPLATE, VERTEX_TEMPLATE};
pub use risf_core::EngineError;
pub use risf_uniforms::{ImageBinding, TextureAddressing};

/// Name of the implicit output framebuffer. Passes with an empty `TARGET`
/// render here, and it is the fallback result target.
pub const DEFAULT_TARGET: &str = "DEFAULT";

/// Color storage for render targets. The default output and every
/// persistent buffer share the format picked at setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb8,
    Rgba8,
    Rgba32F,
}

impl PixelFormat {
    fn internal_format(self) -> i32 {
        (match self {
            PixelFormat::Rgb8 => glow::RGB8,
            PixelFormat::Rgba8 => glow::RGBA8,
            PixelFormat::Rgba32F => glow::RGBA32F,
        }) as i32
    }

    fn format(self) -> u32 {
        match self {
            PixelFormat::Rgb8 => glow::RGB,
            PixelFormat::Rgba8 | PixelFormat::Rgba32F => glow::RGBA,
        }
    }

    fn data_type(self) -> u32 {
        match self {
            PixelFormat::Rgb8 | PixelFormat::Rgba8 => glow::UNSIGNED_BYTE,
            PixelFormat::Rgba32F => glow::FLOAT,
        }
    }
}

/// Offscreen render target (FBO + color texture).
#[derive(Debug)]
pub struct RenderTarget {
    pub fbo: glow::NativeFramebuffer,
    pub tex: glow::NativeTexture,
    pub w: i32,
    pub h: i32,
}

/// Creates a render target cleared to transparent black.
pub unsafe fn create_render_target(
    gl: &glow::Context,
    w: i32,
    h: i32,
    format: PixelFormat,
) -> Result<RenderTarget, EngineError> {
    let fbo = gl
        .create_framebuffer()
        .map_err(|e| EngineError::GlCreate(format!("create_framebuffer failed: {e:?}")))?;
    let tex = gl
        .create_texture()
        .map_err(|e| EngineError::GlCreate(format!("create_texture failed: {e:?}")))?;

    gl.bind_texture(glow::TEXTURE_2D, Some(tex));
    gl.tex_parameter_i32(
        glow::TEXTURE_2D,
        glow::TEXTURE_MIN_FILTER,
        glow::LINEAR as i32,
    );
    gl.tex_parameter_i32(
        glow::TEXTURE_2D,
        glow::TEXTURE_MAG_FILTER,
        glow::LINEAR as i32,
    );
    gl.tex_parameter_i32(
        glow::TEXTURE_2D,
        glow::TEXTURE_WRAP_S,
        glow::CLAMP_TO_EDGE as i32,
    );
    gl.tex_parameter_i32(
        glow::TEXTURE_2D,
        glow::TEXTURE_WRAP_T,
        glow::CLAMP_TO_EDGE as i32,
    );

    let ww = w.max(1);
    let hh = h.max(1);
    gl.tex_image_2d(
        glow::TEXTURE_2D,
        0,
        format.internal_format(),
        ww,
        hh,
        0,
        format.format(),
        format.data_type(),
        None,
    );

    gl.bind_framebuffer(glow::FRAMEBUFFER, Some(fbo));
    gl.framebuffer_texture_2d(
        glow::FRAMEBUFFER,
        glow::COLOR_ATTACHMENT0,
        glow::TEXTURE_2D,
        Some(tex),
        0,
    );

    let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
    if status != glow::FRAMEBUFFER_COMPLETE {
        gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        gl.bind_texture(glow::TEXTURE_2D, None);
        gl.delete_framebuffer(fbo);
        gl.delete_texture(tex);
        return Err(EngineError::GlCreate(format!(
            "framebuffer incomplete: 0x{status:x}"
        )));
    }

    // Clear once at allocation. Persistent buffers are never cleared again;
    // the default target clears at the start of every frame.
    gl.viewport(0, 0, ww, hh);
    gl.clear_color(0.0, 0.0, 0.0, 0.0);
    gl.clear(glow::COLOR_BUFFER_BIT);

    gl.bind_framebuffer(glow::FRAMEBUFFER, None);
    gl.bind_texture(glow::TEXTURE_2D, None);

    Ok(RenderTarget {
        fbo,
        tex,
        w: ww,
        h: hh,
    })
}

/// Compiles and links a vertex/fragment pair. Fullscreen geometry attributes
/// are bound to fixed locations before linking (generated sources are GLSL
/// 120 and declare `attribute` inputs, not layout qualifiers).
pub unsafe fn compile_program(
    gl: &glow::Context,
    vert_src: &str,
    frag_src: &str,
) -> Result<glow::NativeProgram, EngineError> {
    let vs = gl
        .create_shader(glow::VERTEX_SHADER)
        .map_err(|e| EngineError::GlCreate(format!("create_shader(VS) failed: {e:?}")))?;
    gl.shader_source(vs, vert_src);
    gl.compile_shader(vs);
    if !gl.get_shader_compile_status(vs) {
        let log = gl.get_shader_info_log(vs);
        gl.delete_shader(vs);
        return Err(EngineError::VertexCompile(log));
    }

    let fs = gl
        .create_shader(glow::FRAGMENT_SHADER)
        .map_err(|e| EngineError::GlCreate(format!("create_shader(FS) failed: {e:?}")))?;
    gl.shader_source(fs, frag_src);
    gl.compile_shader(fs);
    if !gl.get_shader_compile_status(fs) {
        let log = gl.get_shader_info_log(fs);
        gl.delete_shader(vs);
        gl.delete_shader(fs);
        return Err(EngineError::FragmentCompile(log));
    }

    let program = gl
        .create_program()
        .map_err(|e| EngineError::GlCreate(format!("create_program failed: {e:?}")))?;
    gl.attach_shader(program, vs);
    gl.attach_shader(program, fs);
    gl.bind_attrib_location(program, 0, "a_pos");
    gl.bind_attrib_location(program, 1, "a_uv");
    gl.link_program(program);

    gl.detach_shader(program, vs);
    gl.detach_shader(program, fs);
    gl.delete_shader(vs);
    gl.delete_shader(fs);

    if !gl.get_program_link_status(program) {
        let log = gl.get_program_info_log(program);
        gl.delete_program(program);
        return Err(EngineError::Link(log));
    }

    Ok(program)
}

/// Fullscreen draw geometry: one clip-space triangle with UVs arranged so
/// the visible region interpolates 0..1.
#[derive(Debug)]
pub struct FullscreenTriangle {
    vao: glow::NativeVertexArray,
    vbo: glow::NativeBuffer,
}

impl FullscreenTriangle {
    pub unsafe fn new(gl: &glow::Context) -> Result<Self, EngineError> {
        let verts: [f32; 12] = [
            -1.0, -1.0, 0.0, 0.0, 3.0, -1.0, 2.0, 0.0, -1.0, 3.0, 0.0, 2.0,
        ];

        let vao = gl
            .create_vertex_array()
            .map_err(|e| EngineError::GlCreate(format!("create_vertex_array: {e}")))?;
        let vbo = gl
            .create_buffer()
            .map_err(|e| EngineError::GlCreate(format!("create_buffer: {e}")))?;

        gl.bind_vertex_array(Some(vao));
        gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));

        let bytes = core::slice::from_raw_parts(
            verts.as_ptr() as *const u8,
            verts.len() * core::mem::size_of::<f32>(),
        );
        gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, bytes, glow::STATIC_DRAW);

        gl.enable_vertex_attrib_array(0);
        gl.vertex_attrib_pointer_f32(0, 2, glow::FLOAT, false, 4 * 4, 0);

        gl.enable_vertex_attrib_array(1);
        gl.vertex_attrib_pointer_f32(1, 2, glow::FLOAT, false, 4 * 4, 2 * 4);

        gl.bind_buffer(glow::ARRAY_BUFFER, None);
        gl.bind_vertex_array(None);

        Ok(Self { vao, vbo })
    }

    pub unsafe fn draw(&self, gl: &glow::Context) {
        gl.bind_vertex_array(Some(self.vao));
        gl.draw_arrays(glow::TRIANGLES, 0, 3);
        gl.bind_vertex_array(None);
    }

    pub unsafe fn destroy(&mut self, gl: &glow::Context) {
        gl.delete_vertex_array(self.vao);
        gl.delete_buffer(self.vbo);
    }
}

/// The last declared pass decides where the final output lives; no passes
/// (or an empty trailing target) resolve to the default framebuffer.
fn resolve_result_target(passes: &[PassDecl]) -> &str {
    passes
        .last()
        .map(|p| p.target.as_str())
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_TARGET)
}

/// The ISF shader machine.
///
/// Owns the uniform registry, the framebuffer pool (default output plus
/// persistent buffers and named pass targets), and the compiled program.
/// `load_*` replace the program transactionally: a failed load keeps the
/// previous program, registry, passes and metadata fully intact.
#[derive(Debug)]
pub struct IsfShader {
    render_size: (i32, i32),
    format: PixelFormat,

    name: String,
    description: String,
    credit: String,
    categories: Vec<String>,

    uniforms: UniformRegistry,
    /// Names of the uniforms that came from INPUTS (the public, user-facing
    /// subset), in declaration order. Synthesized persistent-buffer samplers
    /// are excluded.
    input_names: Vec<String>,
    default_image_input: Option<String>,

    passes: Vec<PassDecl>,
    header_src: String,
    body_src: String,

    /// Render targets by name. `DEFAULT` always exists; persistent buffers
    /// and named pass targets are allocated once on first sight and reused
    /// across frames and reloads.
    framebuffers: HashMap<String, RenderTarget>,
    /// Derived texture list: the default output at index 0, then each
    /// persistent buffer in declaration order.
    textures: Vec<(String, glow::NativeTexture)>,
    current_target: String,
    result_target: String,

    program: Option<glow::NativeProgram>,
    generated: Option<GeneratedSource>,

    fs_tri: FullscreenTriangle,
    started: Instant,
}

impl IsfShader {
    /// Creates the machine and allocates the default output target.
    pub unsafe fn new(
        gl: &glow::Context,
        width: i32,
        height: i32,
        format: PixelFormat,
    ) -> Result<Self, EngineError> {
        let mut framebuffers = HashMap::new();
        framebuffers.insert(
            DEFAULT_TARGET.to_string(),
            create_render_target(gl, width, height, format)?,
        );

        Ok(Self {
            render_size: (width.max(1), height.max(1)),
            format,
            name: String::new(),
            description: String::new(),
            credit: String::new(),
            categories: Vec::new(),
            uniforms: UniformRegistry::new(),
            input_names: Vec::new(),
            default_image_input: None,
            passes: Vec::new(),
            header_src: String::new(),
            body_src: String::new(),
            framebuffers,
            textures: Vec::new(),
            current_target: DEFAULT_TARGET.to_string(),
            result_target: DEFAULT_TARGET.to_string(),
            program: None,
            generated: None,
            fs_tri: FullscreenTriangle::new(gl)?,
            started: Instant::now(),
        })
    }

    /// Loads an ISF file from disk. The file stem becomes the shader name.
    pub unsafe fn load_file(
        &mut self,
        gl: &glow::Context,
        path: impl AsRef<Path>,
    ) -> Result<(), EngineError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "loading ISF shader file");

        let split = split_directive(&data)?;
        let (header, body) = (split.header.to_string(), split.body.to_string());
        self.load_source(gl, &header, &body)?;

        self.name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(())
    }

    /// Loads from already-split header and body text.
    pub unsafe fn load_source(
        &mut self,
        gl: &glow::Context,
        header: &str,
        body: &str,
    ) -> Result<(), EngineError> {
        let parsed = Header::parse(header).map_err(|e| {
            tracing::error!("header parse failed: {e}");
            e
        })?;
        self.reload(gl, parsed, header, body)
    }

    /// Rebuilds registry, targets and program from a parsed header.
    ///
    /// Everything is staged first and committed only after a successful
    /// link, so a failing reload leaves the previous compiled state and
    /// registry untouched. The one side effect that can outlive a failure
    /// is buffer allocation: buffers allocate exactly once on first sight
    /// and are reused forever, so an early return simply leaves them ready
    /// for the next attempt.
    unsafe fn reload(
        &mut self,
        gl: &glow::Context,
        header: Header,
        header_src: &str,
        body: &str,
    ) -> Result<(), EngineError> {
        // Stage the registry. Inputs that kept their name and type across
        // the reload keep their current value (and bound texture); a type
        // change replaces the entry wholesale.
        let mut staged = UniformRegistry::new();
        let mut input_names = Vec::with_capacity(header.inputs.len());
        let mut default_image_input = None;
        for decl in &header.inputs {
            let uniform = match self.uniforms.get(decl.name()) {
                Some(prev) if prev.kind() == decl.kind() => prev.clone(),
                _ => Uniform::from_decl(decl),
            };
            if uniform.is_image() && default_image_input.is_none() {
                default_image_input = Some(decl.name().to_string());
            }
            if staged.add(uniform) {
                input_names.push(decl.name().to_string());
            } else {
                tracing::warn!(name = decl.name(), "duplicate INPUTS name ignored");
            }
        }

        // The default output is image index 0 of the derived texture list;
        // persistent buffers follow, each exposed as a bound image uniform.
        let mut textures = vec![(
            DEFAULT_TARGET.to_string(),
            self.framebuffers[DEFAULT_TARGET].tex,
        )];
        for buf in &header.buffers {
            let w = buf.width.unwrap_or(self.render_size.0 as u32) as i32;
            let h = buf.height.unwrap_or(self.render_size.1 as u32) as i32;
            if !self.framebuffers.contains_key(&buf.name) {
                let target = create_render_target(gl, w, h, self.format)?;
                self.framebuffers.insert(buf.name.clone(), target);
            }
            let target = &self.framebuffers[&buf.name];
            textures.push((buf.name.clone(), target.tex));

            let uniform = Uniform::bound_image(
                &buf.name,
                ImageBinding::normalized(target.tex, target.w as f32, target.h as f32),
            );
            if !staged.add(uniform) {
                tracing::warn!(
                    name = %buf.name,
                    "persistent buffer name collides with a declared input"
                );
            }
        }

        // Named pass targets need storage even when they are not declared
        // persistent; allocate them at render size on first sight.
        for pass in &header.passes {
            if !pass.target.is_empty() && !self.framebuffers.contains_key(&pass.target) {
                let target =
                    create_render_target(gl, self.render_size.0, self.render_size.1, self.format)?;
                self.framebuffers.insert(pass.target.clone(), target);
            }
        }

        let result_target = resolve_result_target(&header.passes).to_string();

        // Generate and build the replacement program. Failures from here on
        // return before anything live is touched.
        let generated = generate(body, &staged).map_err(|e| {
            tracing::error!("shader generation failed: {e}");
            e
        })?;
        let program = compile_program(gl, &generated.vertex, &generated.fragment).map_err(|e| {
            tracing::error!("shader build failed: {e}");
            e
        })?;

        // Commit.
        if let Some(old) = self.program.take() {
            gl.delete_program(old);
        }
        self.program = Some(program);
        self.generated = Some(generated);
        self.uniforms = staged;
        self.input_names = input_names;
        self.default_image_input = default_image_input;
        self.description = header.description;
        self.credit = header.credit;
        self.categories = header.categories;
        self.passes = header.passes;
        self.textures = textures;
        self.result_target = result_target;
        self.current_target = DEFAULT_TARGET.to_string();
        self.header_src = header_src.to_string();
        self.body_src = body.to_string();
        Ok(())
    }

    /// Per-frame step: re-link on image format changes, clear the default
    /// output, then run the declared passes in order (or one implicit pass
    /// when none are declared). The current framebuffer is left on the last
    /// rendered target for subsequent `draw`/texture access.
    pub unsafe fn update(&mut self, gl: &glow::Context) {
        // A rectangle<->normalized rebind changes sampler types, so the
        // program must be regenerated before this frame renders.
        let mut format_changed = false;
        for u in self.uniforms.iter_mut() {
            format_changed |= u.texture_format_changed();
        }
        if format_changed {
            let header_src = self.header_src.clone();
            let body_src = self.body_src.clone();
            // Keep rendering the last-good program when the rebuild fails.
            match Header::parse(&header_src) {
                Ok(parsed) => {
                    if let Err(e) = self.reload(gl, parsed, &header_src, &body_src) {
                        tracing::error!("reload after texture format change failed: {e}");
                    }
                }
                Err(e) => tracing::error!("reload after texture format change failed: {e}"),
            }
        }

        // The default output clears every frame; persistent buffers keep
        // their contents until a pass redraws them.
        {
            let default = &self.framebuffers[DEFAULT_TARGET];
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(default.fbo));
            gl.clear_color(0.0, 0.0, 0.0, 0.0);
            gl.clear(glow::COLOR_BUFFER_BIT);
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        }

        if self.passes.is_empty() {
            self.current_target = DEFAULT_TARGET.to_string();
            self.render_pass(gl, 0);
        } else {
            let passes = self.passes.clone();
            for (index, pass) in passes.iter().enumerate() {
                self.current_target = if pass.target.is_empty() {
                    DEFAULT_TARGET.to_string()
                } else {
                    pass.target.clone()
                };
                self.render_pass(gl, index as i32);
            }
        }
    }

    unsafe fn render_pass(&mut self, gl: &glow::Context, index: i32) {
        let Some(program) = self.program else {
            return;
        };
        let Some(target) = self.framebuffers.get(&self.current_target) else {
            tracing::error!(pass_target = %self.current_target, "pass target has no framebuffer");
            return;
        };

        gl.bind_framebuffer(glow::FRAMEBUFFER, Some(target.fbo));
        gl.viewport(0, 0, target.w, target.h);
        gl.disable(glow::DEPTH_TEST);
        gl.enable(glow::BLEND);
        gl.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);

        gl.use_program(Some(program));

        if let Some(loc) = gl.get_uniform_location(program, "PASSINDEX") {
            gl.uniform_1_i32(Some(&loc), index);
        }
        if let Some(loc) = gl.get_uniform_location(program, "RENDERSIZE") {
            gl.uniform_2_f32(
                Some(&loc),
                self.render_size.0 as f32,
                self.render_size.1 as f32,
            );
        }
        if let Some(loc) = gl.get_uniform_location(program, "TIME") {
            gl.uniform_1_f32(Some(&loc), self.started.elapsed().as_secs_f32());
        }

        // Image uniforms consume sequential units; the allocator is fresh
        // per pass.
        let mut units = TextureUnits::new();
        for uniform in self.uniforms.iter_mut() {
            uniform.push_to_program(gl, program, &mut units);
        }

        self.fs_tri.draw(gl);

        gl.use_program(None);
        gl.bind_framebuffer(glow::FRAMEBUFFER, None);
    }

    /// Blits the current framebuffer to the default (window) framebuffer at
    /// native size.
    pub unsafe fn draw(&self, gl: &glow::Context, x: i32, y: i32) {
        if let Some(target) = self.framebuffers.get(&self.current_target) {
            self.blit(gl, target, x, y, target.w, target.h);
        }
    }

    /// Blits the current framebuffer scaled into the given rectangle.
    pub unsafe fn draw_scaled(&self, gl: &glow::Context, x: i32, y: i32, w: i32, h: i32) {
        if let Some(target) = self.framebuffers.get(&self.current_target) {
            self.blit(gl, target, x, y, w, h);
        }
    }

    unsafe fn blit(&self, gl: &glow::Context, target: &RenderTarget, x: i32, y: i32, w: i32, h: i32) {
        gl.bind_framebuffer(glow::READ_FRAMEBUFFER, Some(target.fbo));
        gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, None);
        gl.blit_framebuffer(
            0,
            0,
            target.w,
            target.h,
            x,
            y,
            x + w,
            y + h,
            glow::COLOR_BUFFER_BIT,
            glow::LINEAR,
        );
        gl.bind_framebuffer(glow::READ_FRAMEBUFFER, None);
        gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, None);
    }

    /// Clears the current framebuffer to a color.
    pub unsafe fn clear_current(&self, gl: &glow::Context, color: [f32; 4]) {
        if let Some(target) = self.framebuffers.get(&self.current_target) {
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(target.fbo));
            gl.clear_color(color[0], color[1], color[2], color[3]);
            gl.clear(glow::COLOR_BUFFER_BIT);
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        }
    }

    // ---- Metadata / introspection ----

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn credit(&self) -> &str {
        &self.credit
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn render_size(&self) -> (i32, i32) {
        self.render_size
    }

    pub fn is_loaded(&self) -> bool {
        self.program.is_some()
    }

    /// The user-facing inputs (INPUTS entries only), in declaration order.
    pub fn inputs(&self) -> impl Iterator<Item = &Uniform> {
        self.input_names
            .iter()
            .filter_map(|name| self.uniforms.get(name))
    }

    /// The full registry (inputs plus synthesized buffer samplers).
    pub fn uniforms(&self) -> &UniformRegistry {
        &self.uniforms
    }

    pub fn uniforms_mut(&mut self) -> &mut UniformRegistry {
        &mut self.uniforms
    }

    /// The derived texture list: default output first, then each persistent
    /// buffer in declaration order.
    pub fn textures(&self) -> &[(String, glow::NativeTexture)] {
        &self.textures
    }

    /// The texture holding the final pass's output. Stable across frames
    /// until the next reload.
    pub fn output_texture(&self) -> Option<glow::NativeTexture> {
        self.framebuffers.get(&self.result_target).map(|t| t.tex)
    }

    pub fn generated(&self) -> Option<&GeneratedSource> {
        self.generated.as_ref()
    }

    // ---- Value setters (log-and-ignore convenience over the registry) ----

    pub fn set_bool(&mut self, name: &str, value: bool) {
        log_set(self.uniforms.set_bool(name, value));
    }

    pub fn set_float(&mut self, name: &str, value: f32) {
        log_set(self.uniforms.set_float(name, value));
    }

    pub fn set_color(&mut self, name: &str, value: [f32; 4]) {
        log_set(self.uniforms.set_color(name, value));
    }

    pub fn set_point2d(&mut self, name: &str, value: [f32; 2]) {
        log_set(self.uniforms.set_point2d(name, value));
    }

    pub fn set_long(&mut self, name: &str, value: i32) {
        log_set(self.uniforms.set_long(name, value));
    }

    /// Arms an event input: it uploads true for exactly one render call.
    pub fn fire_event(&mut self, name: &str) {
        log_set(self.uniforms.set_event(name, true));
    }

    pub fn set_image(&mut self, name: &str, binding: Option<ImageBinding>) {
        log_set(self.uniforms.set_image(name, binding));
    }

    /// Binds a texture to the first image-typed INPUT of the current shader.
    pub fn set_image_default(&mut self, binding: Option<ImageBinding>) {
        match self.default_image_input.clone() {
            Some(name) => self.set_image(&name, binding),
            None => tracing::error!("no default image input"),
        }
    }

    /// A diagnostic description of the compiled state: metadata, registry
    /// contents, pass list, and the generated sources.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Name: {}", self.name);
        let _ = writeln!(out, "Description: {}", self.description);
        let _ = writeln!(out, "Credit: {}", self.credit);
        let _ = writeln!(out, "Categories: {}", self.categories.len());
        for cat in &self.categories {
            let _ = writeln!(out, "    {cat}");
        }
        let _ = writeln!(out, "Uniforms:");
        for u in self.uniforms.iter() {
            let _ = writeln!(out, "    {} ({})", u.name(), u.kind());
        }
        let _ = writeln!(out, "Passes: {}", self.passes.len());
        for (i, pass) in self.passes.iter().enumerate() {
            let target = if pass.target.is_empty() {
                DEFAULT_TARGET
            } else {
                pass.target.as_str()
            };
            let _ = writeln!(out, "    [{i}] -> {target}");
        }
        if let Some(generated) = &self.generated {
            let _ = writeln!(out, "=== vertex ===\n{}", generated.vertex);
            let _ = writeln!(out, "=== fragment ===\n{}", generated.fragment);
        }
        out
    }

    /// Prints [`IsfShader::describe`] to stdout.
    pub fn dump(&self) {
        println!("{}", self.describe());
    }

    /// Explicitly destroys every GL object owned by this machine. The host
    /// owns the context, so this cannot live in `Drop`.
    pub unsafe fn destroy(&mut self, gl: &glow::Context) {
        if let Some(program) = self.program.take() {
            gl.delete_program(program);
        }
        for (_, target) in self.framebuffers.drain() {
            gl.delete_framebuffer(target.fbo);
            gl.delete_texture(target.tex);
        }
        self.textures.clear();
        self.uniforms.clear();
        self.fs_tri.destroy(gl);
    }
}

fn log_set(result: Result<(), EngineError>) {
    if let Err(e) = result {
        tracing::error!("{e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_target_resolution() {
        assert_eq!(resolve_result_target(&[]), DEFAULT_TARGET);
        assert_eq!(
            resolve_result_target(&[PassDecl { target: "a".into() }]),
            "a"
        );
        assert_eq!(
            resolve_result_target(&[
                PassDecl { target: "a".into() },
                PassDecl { target: "".into() }
            ]),
            DEFAULT_TARGET
        );
    }

    #[test]
    fn pixel_format_mapping() {
        assert_eq!(PixelFormat::Rgb8.internal_format(), glow::RGB8 as i32);
        assert_eq!(PixelFormat::Rgba32F.data_type(), glow::FLOAT);
        assert_eq!(PixelFormat::Rgba8.format(), glow::RGBA);
    }
}
