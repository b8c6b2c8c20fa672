//! Asset emission.
//!
//! Files are produced in an order that makes every hash well defined:
//!
//! 1. assets, named from their source bytes;
//! 2. extracted stylesheets, which may reference asset files;
//! 3. async and split chunk scripts;
//! 4. entry scripts, which embed the file names of the chunks they load
//!    (each script's source map follows it, named after it);
//! 5. HTML pages, which reference entry files;
//! 6. the manifest, which lists everything.
//!
//! Each step only needs names fixed by the steps before it, so
//! `[contenthash]` can always be taken from a file's final bytes.

use std::path::Path;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use tote_config::{Devtool, PluginsExt, ToteConfig};
use tote_graph::{AssetMode, Module, ModuleGraph, ModuleId, ModuleKind, Runtime};

use crate::chunk::{Chunk, ChunkGraph, ChunkKind};
use crate::codegen::css::chunk_css;
use crate::codegen::source_map::{MappedModule, mapping_comment, script_source_map};
use crate::codegen::{
    AssetRef, ChunkFiles, EntryRuntime, RenderContext, Syntax, render_chunk_script, render_entry_script,
    render_module,
};
use crate::minify::{Minifier, production_options};
use crate::output::{ChunkInfo, FileKind, OutputFile};
use crate::plugins::{EntryAssets, load_template, render_page};
use crate::template::{HashBuilder, PathData, content_hash, render_template};
use crate::{Error, Result};

/// Everything emission reads.
#[derive(Clone, Copy)]
pub struct EmitContext<'a> {
    pub config: &'a ToteConfig,
    pub root: &'a Path,
    pub graph: &'a ModuleGraph,
    pub chunks: &'a ChunkGraph,
    pub runtime: &'a dyn Runtime,
    pub minifier: &'a Minifier,
    pub minimize: bool,
    /// Build fingerprint, folded into `[hash]`.
    pub fingerprint: &'a str,
}

#[derive(Debug, Clone)]
pub struct Emitted {
    pub files: Vec<OutputFile>,
    pub entrypoints: IndexMap<String, Vec<String>>,
    pub chunks: Vec<ChunkInfo>,
    pub hash: String,
}

pub async fn emit(ctx: EmitContext<'_>) -> Result<Emitted> {
    if ctx.minimize && ctx.config.devtool.is_some() {
        tracing::warn!("scripts are not minimized while devtool is set");
    }
    let mut emitter = Emitter::new(ctx);
    emitter.emit_assets()?;
    emitter.emit_styles()?;
    emitter.emit_chunk_scripts()?;
    emitter.emit_entry_scripts()?;
    emitter.emit_html().await?;
    emitter.emit_manifest()?;
    Ok(emitter.finish())
}

struct Emitter<'a> {
    ctx: EmitContext<'a>,
    modules: FxHashMap<ModuleId, Arc<Module>>,
    /// Modules sorted by id.
    sorted: Vec<Arc<Module>>,
    build_hash: String,
    chunk_hashes: Vec<String>,
    assets: FxHashMap<ModuleId, AssetRef>,
    /// Root-relative source path and output name of each resource asset.
    asset_names: Vec<(String, String)>,
    js_files: Vec<Option<String>>,
    css_files: Vec<Option<String>>,
    entry_assets: Vec<EntryAssets>,
    entrypoints: IndexMap<String, Vec<String>>,
    files: Vec<OutputFile>,
}

impl<'a> Emitter<'a> {
    fn new(ctx: EmitContext<'a>) -> Self {
        let sorted = ctx.graph.modules();
        let modules = sorted.iter().map(|m| (m.id.clone(), m.clone())).collect();

        let mut build = HashBuilder::default().part(ctx.fingerprint);
        for module in &sorted {
            build = build.part(module.id.relative_to(ctx.root)).part(&module.content_hash);
        }
        let build_hash = build.finish();

        let chunk_count = ctx.chunks.len();
        let mut emitter = Self {
            ctx,
            modules,
            sorted,
            build_hash,
            chunk_hashes: Vec::with_capacity(chunk_count),
            assets: FxHashMap::default(),
            asset_names: Vec::new(),
            js_files: vec![None; chunk_count],
            css_files: vec![None; chunk_count],
            entry_assets: Vec::new(),
            entrypoints: IndexMap::new(),
            files: Vec::new(),
        };
        emitter.chunk_hashes = ctx
            .chunks
            .chunks()
            .iter()
            .map(|chunk| emitter.chunk_hash(chunk))
            .collect();
        emitter
    }

    /// `[chunkhash]`: the chunk's modules and their transformed code.
    fn chunk_hash(&self, chunk: &Chunk) -> String {
        let mut hash = HashBuilder::default().part(&chunk.name);
        for module in self.chunk_modules(chunk) {
            hash = hash
                .part(module.id.relative_to(self.ctx.root))
                .part(module.output.as_bytes());
        }
        hash.finish()
    }

    fn chunk_modules(&self, chunk: &Chunk) -> Vec<&Arc<Module>> {
        chunk.modules.iter().filter_map(|id| self.modules.get(id)).collect()
    }

    fn render_ctx(&self) -> RenderContext<'_> {
        RenderContext {
            root: self.ctx.root,
            chunks: self.ctx.chunks,
            assets: &self.assets,
            public_path: &self.ctx.config.output.public_path,
            extract_css: self.ctx.config.plugins.css_extract().is_some(),
            syntax: Syntax::from(self.ctx.config.output.environment),
        }
    }

    fn factories(&self, chunk: &Chunk, render: &RenderContext<'_>) -> Vec<String> {
        self.chunk_modules(chunk)
            .into_iter()
            .map(|module| render_module(module, render))
            .collect()
    }

    fn chunk_filename(&self, template: &str, chunk: &Chunk, ext: &str, contents: &str) -> String {
        let contenthash = content_hash(contents);
        let id = chunk.idx.to_string();
        render_template(
            template,
            &PathData {
                name: &chunk.name,
                id: &id,
                ext,
                hash: Some(&self.build_hash),
                chunkhash: Some(&self.chunk_hashes[chunk.idx]),
                contenthash: Some(&contenthash),
            },
        )
    }

    fn minify_scripts(&self, scripts: Vec<String>) -> Vec<String> {
        if self.ctx.minimize && self.ctx.config.devtool.is_none() {
            self.ctx.minifier.all(&scripts, Minifier::js)
        } else {
            scripts
        }
    }

    /// Add a file. Re-emitting identical bytes under a name is a no-op;
    /// different bytes under the same name are an error.
    fn push(&mut self, file: OutputFile) -> Result<()> {
        if let Some(existing) = self.files.iter().find(|f| f.name == file.name) {
            if existing.contents == file.contents {
                return Ok(());
            }
            return Err(Error::DuplicateOutput { filename: file.name });
        }
        tracing::debug!(file = %file.name, size = file.size(), "emitted");
        self.files.push(file);
        Ok(())
    }

    fn emit_assets(&mut self) -> Result<()> {
        let config = self.ctx.config;
        for module in self.sorted.clone() {
            let ModuleKind::Asset(mode) = module.kind else {
                continue;
            };
            let ext = module.id.extension();
            match mode {
                AssetMode::Resource => {
                    let template = module
                        .asset_filename
                        .as_deref()
                        .unwrap_or(&config.output.asset_filename);
                    let hash = content_hash(&module.source);
                    let stem = module.id.file_stem();
                    let name = render_template(
                        template,
                        &PathData {
                            name: &stem,
                            id: &stem,
                            ext: &ext,
                            hash: Some(&self.build_hash),
                            chunkhash: Some(&hash),
                            contenthash: Some(&hash),
                        },
                    );
                    self.push(OutputFile::new(name.clone(), module.source.to_vec(), FileKind::Asset))?;
                    let key = module.id.relative_to(self.ctx.root);
                    self.asset_names
                        .push((key.trim_start_matches("./").to_string(), name.clone()));
                    self.assets.insert(module.id.clone(), AssetRef::File(name));
                }
                AssetMode::Inline => {
                    self.assets
                        .insert(module.id.clone(), AssetRef::DataUrl(data_url(&ext, &module.source)));
                }
                AssetMode::Source => {}
            }
        }
        Ok(())
    }

    fn emit_styles(&mut self) -> Result<()> {
        let config = self.ctx.config;
        let Some(extract) = config.plugins.css_extract() else {
            return Ok(());
        };
        let chunks = self.ctx.chunks;

        let mut indices = Vec::new();
        let mut sources = Vec::new();
        {
            let render = self.render_ctx();
            for chunk in chunks.chunks().iter().filter(|c| c.has_file()) {
                let css = chunk_css(self.chunk_modules(chunk).into_iter().map(|m| m.as_ref()), &render);
                if !css.trim().is_empty() {
                    indices.push(chunk.idx);
                    sources.push(css);
                }
            }
        }
        let sources = if self.ctx.minimize && config.plugins.css_minimizer() {
            self.ctx.minifier.all(&sources, Minifier::css)
        } else {
            sources
        };

        for (idx, css) in indices.into_iter().zip(sources) {
            let chunk = chunks.chunk(idx);
            let template = if chunk.kind == ChunkKind::Entry {
                extract.filename.as_deref().unwrap_or(&config.output.css_filename)
            } else {
                extract
                    .chunk_filename
                    .as_deref()
                    .unwrap_or(&config.output.css_chunk_filename)
            };
            let name = self.chunk_filename(template, chunk, "css", &css);
            self.push(OutputFile::new(name.clone(), css, FileKind::Style).with_chunk(&chunk.name))?;
            self.css_files[idx] = Some(name);
        }
        Ok(())
    }

    fn emit_chunk_scripts(&mut self) -> Result<()> {
        let chunks = self.ctx.chunks;
        let targets: Vec<&Chunk> = chunks
            .chunks()
            .iter()
            .filter(|c| c.kind != ChunkKind::Entry && c.has_file())
            .collect();

        let (scripts, factories): (Vec<String>, Vec<Vec<String>>) = {
            let render = self.render_ctx();
            targets
                .iter()
                .map(|chunk| {
                    let factories = self.factories(chunk, &render);
                    (render_chunk_script(chunk, &factories), factories)
                })
                .unzip()
        };
        let scripts = self.minify_scripts(scripts);

        let config = self.ctx.config;
        let template = &config.output.chunk_filename;
        for ((chunk, script), factories) in targets.into_iter().zip(scripts).zip(factories) {
            self.push_script(template, chunk, script, &factories)?;
        }
        Ok(())
    }

    /// Name a script from its rendered bytes and emit it, with its source map
    /// when `devtool` is set.
    fn push_script(&mut self, template: &str, chunk: &Chunk, mut script: String, factories: &[String]) -> Result<()> {
        let name = self.chunk_filename(template, chunk, "js", &script);
        if let Some(devtool) = self.ctx.config.devtool {
            self.attach_source_map(devtool, &name, chunk, &mut script, factories)?;
        }
        self.push(OutputFile::new(name.clone(), script, FileKind::Script).with_chunk(&chunk.name))?;
        self.js_files[chunk.idx] = Some(name);
        Ok(())
    }

    fn attach_source_map(
        &mut self,
        devtool: Devtool,
        name: &str,
        chunk: &Chunk,
        script: &mut String,
        factories: &[String],
    ) -> Result<()> {
        let file = name.rsplit('/').next().unwrap_or(name);
        let json = {
            let modules: Vec<MappedModule<'_>> = self
                .chunk_modules(chunk)
                .into_iter()
                .zip(factories)
                .map(|(module, factory)| MappedModule {
                    source: format!("tote:///{}", module.id.relative_to(self.ctx.root).trim_start_matches("./")),
                    content: String::from_utf8_lossy(&module.source),
                    factory,
                })
                .collect();
            script_source_map(file, script, &modules)?
        };
        let Some(json) = json else {
            return Ok(());
        };

        let url = match devtool {
            Devtool::SourceMap => Some(format!("{file}.map")),
            Devtool::InlineSourceMap => Some(format!(
                "data:application/json;charset=utf-8;base64,{}",
                STANDARD.encode(&json)
            )),
            Devtool::HiddenSourceMap => None,
        };
        if let Some(url) = url {
            if !script.ends_with('\n') {
                script.push('\n');
            }
            script.push_str(&mapping_comment(&url));
        }
        if devtool.writes_file() {
            self.push(OutputFile::new(format!("{name}.map"), json, FileKind::SourceMap).with_chunk(&chunk.name))?;
        }
        Ok(())
    }

    /// The runtime tables for one entry: its initial chunks, and the group
    /// and files of every async chunk it can reach.
    fn entry_runtime<'c>(&'c self, chunk: &'c Chunk, render: &RenderContext<'_>) -> EntryRuntime<'c> {
        let chunks = self.ctx.chunks;
        let roots = chunk.roots.iter().map(|id| render.module_key(id)).collect();
        let initial = chunk
            .group
            .iter()
            .filter(|&&member| member != chunk.idx)
            .map(|&member| chunks.chunk(member).name.clone())
            .collect();

        let mut groups = Vec::new();
        let mut files = Vec::new();
        let mut seen = FxHashSet::default();
        for idx in chunks.reachable_async(chunk.idx) {
            let target = chunks.chunk(idx);
            if target.group.is_empty() {
                continue;
            }
            let members = target
                .group
                .iter()
                .map(|&member| chunks.chunk(member).name.clone())
                .collect();
            groups.push((target.name.clone(), members));

            for &member in &target.group {
                if !seen.insert(member) {
                    continue;
                }
                if let Some(js) = &self.js_files[member] {
                    files.push((
                        chunks.chunk(member).name.clone(),
                        ChunkFiles {
                            js: js.clone(),
                            css: self.css_files[member].clone(),
                        },
                    ));
                }
            }
        }

        EntryRuntime {
            chunk,
            roots,
            initial,
            groups,
            files,
            public_path: &self.ctx.config.output.public_path,
            library: self.ctx.config.output.library.as_ref(),
        }
    }

    /// An entry embeds the file names of every async chunk it can load, so
    /// its `[chunkhash]` covers those names as well as its own modules.
    fn entry_hash(&self, chunk: &Chunk, runtime: &EntryRuntime<'_>) -> String {
        let mut hash = HashBuilder::default().part(&self.chunk_hashes[chunk.idx]);
        for (name, files) in &runtime.files {
            hash = hash.part(name).part(&files.js);
            if let Some(css) = &files.css {
                hash = hash.part(css);
            }
        }
        hash.finish()
    }

    fn emit_entry_scripts(&mut self) -> Result<()> {
        let chunks = self.ctx.chunks;
        let config = self.ctx.config;
        let syntax = Syntax::from(config.output.environment);
        let entries: Vec<&Chunk> = chunks.entry_chunks().collect();

        let mut hashes = Vec::with_capacity(entries.len());
        let mut factories = Vec::with_capacity(entries.len());
        let scripts: Vec<String> = {
            let render = self.render_ctx();
            entries
                .iter()
                .map(|chunk| {
                    let runtime = self.entry_runtime(chunk, &render);
                    let chunk_factories = self.factories(chunk, &render);
                    let script = render_entry_script(&runtime, &chunk_factories, syntax);
                    hashes.push(self.entry_hash(chunk, &runtime));
                    factories.push(chunk_factories);
                    script
                })
                .collect()
        };
        let scripts = self.minify_scripts(scripts);

        for (((chunk, script), hash), chunk_factories) in
            entries.into_iter().zip(scripts).zip(hashes).zip(factories)
        {
            self.chunk_hashes[chunk.idx] = hash;
            self.push_script(&config.output.filename, chunk, script, &chunk_factories)?;

            let mut assets = EntryAssets {
                name: chunk.name.clone(),
                ..EntryAssets::default()
            };
            let mut loaded = Vec::new();
            for &member in &chunk.group {
                if let Some(css) = &self.css_files[member] {
                    assets.styles.push(css.clone());
                    loaded.push(css.clone());
                }
                if let Some(js) = &self.js_files[member] {
                    assets.scripts.push(js.clone());
                    loaded.push(js.clone());
                }
            }
            self.entrypoints.insert(chunk.name.clone(), loaded);
            self.entry_assets.push(assets);
        }
        Ok(())
    }

    async fn emit_html(&mut self) -> Result<()> {
        let config = self.ctx.config;
        let plugins = config.plugins.html_plugins();
        if plugins.is_empty() {
            return Ok(());
        }

        let public = &config.output.public_path;
        let assets: Vec<EntryAssets> = self
            .entry_assets
            .iter()
            .map(|entry| EntryAssets {
                name: entry.name.clone(),
                scripts: entry.scripts.iter().map(|f| format!("{public}{f}")).collect(),
                styles: entry.styles.iter().map(|f| format!("{public}{f}")).collect(),
            })
            .collect();

        for plugin in plugins {
            let template = load_template(plugin, self.ctx.root, self.ctx.runtime).await?;
            let mut html = render_page(template.as_deref(), plugin, &assets);
            let options = plugin
                .minify
                .or_else(|| self.ctx.minimize.then(production_options));
            if let Some(options) = options {
                html = self.ctx.minifier.html(&html, &options);
            }

            let contenthash = content_hash(&html);
            let (stem, ext) = plugin
                .filename
                .rsplit_once('.')
                .unwrap_or((plugin.filename.as_str(), "html"));
            let name = render_template(
                &plugin.filename,
                &PathData {
                    name: stem,
                    id: stem,
                    ext,
                    hash: Some(&self.build_hash),
                    chunkhash: None,
                    contenthash: Some(&contenthash),
                },
            );
            self.push(OutputFile::new(name, html, FileKind::Html))?;
        }
        Ok(())
    }

    fn emit_manifest(&mut self) -> Result<()> {
        let config = self.ctx.config;
        if !config.output.manifest {
            return Ok(());
        }
        let public = &config.output.public_path;
        let mut files: IndexMap<String, String> = IndexMap::new();

        for chunk in self.ctx.chunks.chunks() {
            if let Some(css) = &self.css_files[chunk.idx] {
                files.insert(format!("{}.css", chunk.name), format!("{public}{css}"));
            }
            if let Some(js) = &self.js_files[chunk.idx] {
                files.insert(format!("{}.js", chunk.name), format!("{public}{js}"));
            }
        }
        for (source, name) in &self.asset_names {
            files.insert(source.clone(), format!("{public}{name}"));
        }
        for file in self.files.iter().filter(|f| f.kind == FileKind::Html) {
            files.insert(file.name.clone(), format!("{public}{}", file.name));
        }

        let manifest = serde_json::json!({
            "files": files,
            "entrypoints": self.entrypoints,
        });
        let mut text = serde_json::to_string_pretty(&manifest)
            .map_err(|e| Error::WriteFailure(format!("manifest.json: {e}")))?;
        text.push('\n');
        self.push(OutputFile::new("manifest.json", text, FileKind::Manifest))
    }

    fn finish(self) -> Emitted {
        let chunks = self.ctx.chunks;
        let infos = chunks
            .chunks()
            .iter()
            .filter(|chunk| chunk.has_file())
            .map(|chunk| ChunkInfo {
                name: chunk.name.clone(),
                kind: chunk.kind,
                files: self.js_files[chunk.idx]
                    .iter()
                    .chain(self.css_files[chunk.idx].iter())
                    .cloned()
                    .collect(),
                modules: chunk
                    .modules
                    .iter()
                    .map(|id| id.relative_to(self.ctx.root))
                    .collect(),
                hash: self.chunk_hashes[chunk.idx].clone(),
            })
            .collect();

        tracing::debug!(files = self.files.len(), hash = %self.build_hash, "emission finished");
        Emitted {
            files: self.files,
            entrypoints: self.entrypoints,
            chunks: infos,
            hash: self.build_hash,
        }
    }
}

/// `data:` URL for an inlined asset.
fn data_url(ext: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type(ext), STANDARD.encode(bytes))
}

fn mime_type(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "ico" => "image/x-icon",
        "bmp" => "image/bmp",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_urls() {
        assert_eq!(data_url("svg", b"<svg/>"), "data:image/svg+xml;base64,PHN2Zy8+");
        assert_eq!(data_url("PNG", b""), "data:image/png;base64,");
        assert!(data_url("bin", b"x").starts_with("data:application/octet-stream;"));
    }
}
