use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use sprite_player_core::{
    yield_now, AssetSource, Clock, Config, ContainerAttributes, Cooperative, FrameDriver,
    LoadOutcome, LoadingIndicator, Opacity, PlayerError, PlayerRegistry, RenderTree, Scheduler,
    SpriteNode, SpritePlayer, Stage, TickReport,
};

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

static ID_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\sid="([^"]+)""#).expect("id pattern should compile"));

static ELEMENT_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<(/?)([A-Za-z][\w:.-]*)[^>]*?(/?)>").expect("tag pattern should compile")
});

/// Whether every element tag in `markup` is closed by a matching end tag.
fn tags_balanced(markup: &str) -> bool {
    let mut open: Vec<&str> = Vec::new();
    for caps in ELEMENT_TAG.captures_iter(markup) {
        let name = caps.get(2).map_or("", |m| m.as_str());
        if &caps[1] == "/" {
            if open.pop() != Some(name) {
                return false;
            }
        } else if &caps[3] != "/" {
            open.push(name);
        }
    }
    open.is_empty()
}

#[derive(Debug, Deserialize)]
struct Manifest {
    animations: HashMap<String, AnimationEntry>,
}

#[derive(Debug, Deserialize)]
struct AnimationEntry {
    #[serde(default)]
    preview: Option<String>,
    sprite: String,
    timeline: String,
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn read_to_string(rel: &str) -> Result<String> {
    let path = fixtures_root().join(rel);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture at {}", path.display()))
}

fn lookup(name: &str) -> Result<&'static AnimationEntry> {
    MANIFEST
        .animations
        .get(name)
        .ok_or_else(|| anyhow!("unknown animation fixture '{name}'"))
}

pub mod animations {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.animations.keys().cloned().collect()
    }

    pub fn sprite(name: &str) -> Result<String> {
        read_to_string(&lookup(name)?.sprite)
    }

    pub fn timeline(name: &str) -> Result<String> {
        read_to_string(&lookup(name)?.timeline)
    }

    pub fn preview(name: &str) -> Result<Option<String>> {
        match &lookup(name)?.preview {
            Some(rel) => read_to_string(rel).map(Some),
            None => Ok(None),
        }
    }
}

/// Sprite markup with the given frame ids (and optionally a background).
pub fn sprite_markup(frames: &[u32], background: bool) -> String {
    let mut out = String::from(r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10">"#);
    if background {
        out.push_str(r#"<g id="background"><rect width="10" height="10"/></g>"#);
    }
    for id in frames {
        out.push_str(&format!(r#"<g id="frame_{id}"><circle r="{id}"/></g>"#));
    }
    out.push_str("</svg>");
    out
}

/// Timeline script for `id` with `(frame, duration)` holds.
pub fn timeline_script(id: &str, entries: &[(u32, f64)]) -> String {
    let body: Vec<String> = entries
        .iter()
        .map(|(frame, duration)| format!("  {{ frame: {frame}, duration: {duration} }},"))
        .collect();
    format!("const {id}_timeline = [\n{}\n];\n", body.join("\n"))
}

// ---------- render tree ----------

#[derive(Debug)]
struct NodeData {
    id: Option<String>,
    opacity: Cell<Option<Opacity>>,
    opacity_writes: Cell<usize>,
    visible: Cell<bool>,
    children: RefCell<Vec<MemNode>>,
    descendants: Vec<MemNode>,
}

/// In-memory element handle.
#[derive(Clone, Debug)]
pub struct MemNode(Rc<NodeData>);

impl MemNode {
    fn new(id: Option<String>, descendants: Vec<MemNode>) -> Self {
        Self(Rc::new(NodeData {
            id,
            opacity: Cell::new(None),
            opacity_writes: Cell::new(0),
            visible: Cell::new(true),
            children: RefCell::new(Vec::new()),
            descendants,
        }))
    }

    pub fn id(&self) -> Option<&str> {
        self.0.id.as_deref()
    }

    pub fn opacity(&self) -> Option<Opacity> {
        self.0.opacity.get()
    }

    pub fn opacity_writes(&self) -> usize {
        self.0.opacity_writes.get()
    }

    pub fn is_visible(&self) -> bool {
        self.0.visible.get()
    }

    pub fn children(&self) -> Vec<MemNode> {
        self.0.children.borrow().clone()
    }

    pub fn child_ids(&self) -> Vec<String> {
        self.0
            .children
            .borrow()
            .iter()
            .filter_map(|c| c.id().map(str::to_string))
            .collect()
    }

    pub fn child(&self, id: &str) -> Option<MemNode> {
        self.0
            .children
            .borrow()
            .iter()
            .find(|c| c.id() == Some(id))
            .cloned()
    }

    /// Ids of children currently shown.
    pub fn shown_ids(&self) -> Vec<String> {
        self.0
            .children
            .borrow()
            .iter()
            .filter(|c| c.opacity() == Some(Opacity::Visible))
            .filter_map(|c| c.id().map(str::to_string))
            .collect()
    }

    /// Total opacity writes over all children.
    pub fn total_writes(&self) -> usize {
        self.0
            .children
            .borrow()
            .iter()
            .map(MemNode::opacity_writes)
            .sum()
    }

    pub fn ptr_eq(&self, other: &MemNode) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl SpriteNode for MemNode {
    fn set_opacity(&self, opacity: Opacity) {
        self.0.opacity.set(Some(opacity));
        self.0.opacity_writes.set(self.0.opacity_writes.get() + 1);
    }

    fn set_visible(&self, visible: bool) {
        self.0.visible.set(visible);
    }
}

// ---------- loading indicator ----------

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum IndicatorEvent {
    Progress(f64),
    Cleanup(LoadOutcome),
}

pub struct RecordingIndicator {
    container: String,
    log: Rc<RefCell<Vec<(String, IndicatorEvent)>>>,
}

impl LoadingIndicator for RecordingIndicator {
    fn update_progress(&mut self, percent: f64) {
        self.log
            .borrow_mut()
            .push((self.container.clone(), IndicatorEvent::Progress(percent)));
    }

    fn cleanup(&mut self, outcome: LoadOutcome) {
        self.log
            .borrow_mut()
            .push((self.container.clone(), IndicatorEvent::Cleanup(outcome)));
    }
}

// ---------- host ----------

/// Host backed by an in-memory file map and render tree, recording what the
/// core asks of it.
#[derive(Default)]
pub struct MemoryHost {
    files: RefCell<HashMap<String, String>>,
    fetches: RefCell<Vec<String>>,
    yields: Cell<usize>,
    parses: Cell<usize>,
    previews: RefCell<Vec<(String, String)>>,
    mounts: RefCell<Vec<(String, MemNode)>>,
    indicator_log: Rc<RefCell<Vec<(String, IndicatorEvent)>>>,
    fail_mount: Cell<bool>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_file(&self, path: impl Into<String>, text: impl Into<String>) {
        self.files.borrow_mut().insert(path.into(), text.into());
    }

    pub fn remove_file(&self, path: &str) {
        self.files.borrow_mut().remove(path);
    }

    /// Serve the manifest fixture `name` under `base_path`.
    pub fn with_fixture(&self, name: &str, base_path: &str) -> Result<()> {
        self.insert_file(format!("{base_path}/sprite.svg"), animations::sprite(name)?);
        self.insert_file(
            format!("{base_path}/timeline.js"),
            animations::timeline(name)?,
        );
        if let Some(preview) = animations::preview(name)? {
            self.insert_file(format!("{base_path}/preview.svg"), preview);
        }
        Ok(())
    }

    pub fn fail_mount(&self, fail: bool) {
        self.fail_mount.set(fail);
    }

    pub fn fetches(&self) -> Vec<String> {
        self.fetches.borrow().clone()
    }

    pub fn fetch_count(&self, path: &str) -> usize {
        self.fetches.borrow().iter().filter(|p| *p == path).count()
    }

    pub fn yields(&self) -> usize {
        self.yields.get()
    }

    pub fn parses(&self) -> usize {
        self.parses.get()
    }

    pub fn previews(&self) -> Vec<(String, String)> {
        self.previews.borrow().clone()
    }

    /// Mounted sprite root of `container`, if any.
    pub fn mounted(&self, container: &str) -> Option<MemNode> {
        self.mounts
            .borrow()
            .iter()
            .rev()
            .find(|(c, _)| c == container)
            .map(|(_, root)| root.clone())
    }

    pub fn mount_count(&self) -> usize {
        self.mounts.borrow().len()
    }

    pub fn indicator_events(&self, container: &str) -> Vec<IndicatorEvent> {
        self.indicator_log
            .borrow()
            .iter()
            .filter(|(c, _)| c == container)
            .map(|(_, e)| *e)
            .collect()
    }

    /// Progress values reported for `container`, in order.
    pub fn progress(&self, container: &str) -> Vec<f64> {
        self.indicator_events(container)
            .into_iter()
            .filter_map(|e| match e {
                IndicatorEvent::Progress(p) => Some(p),
                IndicatorEvent::Cleanup(_) => None,
            })
            .collect()
    }
}

impl AssetSource for MemoryHost {
    fn fetch_text(
        &self,
        path: &str,
    ) -> impl Future<Output = core::result::Result<String, String>> {
        self.fetches.borrow_mut().push(path.to_string());
        let found = self
            .files
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| format!("404 Not Found: {path}"));
        async move {
            yield_now().await;
            found
        }
    }
}

impl Cooperative for MemoryHost {
    fn yield_now(&self) -> impl Future<Output = ()> {
        self.yields.set(self.yields.get() + 1);
        yield_now()
    }
}

impl RenderTree for MemoryHost {
    type Node = MemNode;

    fn parse_document(&self, markup: &str) -> sprite_player_core::Result<MemNode> {
        self.parses.set(self.parses.get() + 1);
        let trimmed = markup.trim_start();
        if !trimmed.starts_with("<svg") || !trimmed.trim_end().ends_with("</svg>") {
            return Err(PlayerError::render_tree("document is not an svg root"));
        }
        if !tags_balanced(markup) {
            return Err(PlayerError::render_tree("mismatched tag"));
        }
        let descendants = ID_ATTR
            .captures_iter(markup)
            .map(|caps| MemNode::new(Some(caps[1].to_string()), Vec::new()))
            .collect();
        Ok(MemNode::new(None, descendants))
    }

    fn find_by_id(&self, root: &MemNode, id: &str) -> Option<MemNode> {
        root.0.descendants.iter().find(|n| n.id() == Some(id)).cloned()
    }

    fn append_child(&self, parent: &MemNode, child: &MemNode) -> sprite_player_core::Result<()> {
        parent.0.children.borrow_mut().push(child.clone());
        Ok(())
    }
}

impl Stage for MemoryHost {
    type Container = String;
    type Indicator = RecordingIndicator;

    fn show_preview(&self, container: &String, markup: &str) -> sprite_player_core::Result<()> {
        self.previews
            .borrow_mut()
            .push((container.clone(), markup.to_string()));
        Ok(())
    }

    fn mount(
        &self,
        container: &String,
        root: &MemNode,
    ) -> impl Future<Output = sprite_player_core::Result<()>> {
        let result = if self.fail_mount.get() {
            Err(PlayerError::Mount {
                reason: format!("container {container} is detached"),
            })
        } else {
            root.set_visible(true);
            self.mounts
                .borrow_mut()
                .push((container.clone(), root.clone()));
            Ok(())
        };
        async move { result }
    }

    fn loading_indicator(&self, container: &String) -> RecordingIndicator {
        RecordingIndicator {
            container: container.clone(),
            log: Rc::clone(&self.indicator_log),
        }
    }
}

// ---------- clock and frame driver ----------

#[derive(Debug, Default)]
pub struct ManualClock(Cell<f64>);

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        Self(Cell::new(start_ms))
    }

    pub fn set(&self, now_ms: f64) {
        self.0.set(now_ms);
    }

    pub fn advance(&self, delta_ms: f64) -> f64 {
        self.0.set(self.0.get() + delta_ms);
        self.0.get()
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.0.get()
    }
}

#[derive(Debug, Default)]
pub struct ManualFrameDriver(Cell<usize>);

impl ManualFrameDriver {
    pub fn requests(&self) -> usize {
        self.0.get()
    }
}

impl FrameDriver for ManualFrameDriver {
    fn request_frame(&self) {
        self.0.set(self.0.get() + 1);
    }
}

// ---------- rig ----------

/// Registry over a [`MemoryHost`] with a manual clock.
pub struct Rig {
    pub host: Rc<MemoryHost>,
    pub clock: Rc<ManualClock>,
    pub driver: Rc<ManualFrameDriver>,
    pub registry: PlayerRegistry<MemoryHost>,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let host = Rc::new(MemoryHost::new());
        let clock = Rc::new(ManualClock::new(1_000.0));
        let driver = Rc::new(ManualFrameDriver::default());
        let scheduler = Scheduler::new(&config, clock.clone(), driver.clone());
        let registry = PlayerRegistry::new(host.clone(), config, scheduler);
        Self {
            host,
            clock,
            driver,
            registry,
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        self.registry.scheduler()
    }

    /// Serve fixture `name` at `anim/<id>` and register a container `id` for it.
    pub fn add_fixture(&mut self, name: &str, id: &str) -> Result<SpritePlayer<MemoryHost>> {
        let base = format!("anim/{id}");
        self.host.with_fixture(name, &base)?;
        self.register(id)
    }

    /// Serve raw assets at `anim/<id>` and register a container `id` for them.
    pub fn add_assets(
        &mut self,
        id: &str,
        sprite: &str,
        timeline: &str,
    ) -> Result<SpritePlayer<MemoryHost>> {
        let base = format!("anim/{id}");
        self.host.insert_file(format!("{base}/sprite.svg"), sprite);
        self.host.insert_file(format!("{base}/timeline.js"), timeline);
        self.register(id)
    }

    fn register(&mut self, id: &str) -> Result<SpritePlayer<MemoryHost>> {
        self.registry
            .register(
                id.to_string(),
                &ContainerAttributes::new(id, format!("anim/{id}")),
            )
            .ok_or_else(|| anyhow!("container {id} was not registered"))
    }

    /// Move the clock to `now_ms` and run one scheduler tick there.
    pub fn frame(&self, now_ms: f64) -> TickReport {
        self.clock.set(now_ms);
        self.scheduler().tick(now_ms)
    }
}

impl Default for Rig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_manifest_entry_resolves() {
        for name in animations::keys() {
            assert!(animations::sprite(&name).is_ok(), "{name}");
            assert!(animations::timeline(&name).is_ok(), "{name}");
            animations::preview(&name).unwrap();
        }
    }

    #[test]
    fn parse_document_indexes_ids() {
        let host = MemoryHost::new();
        let root = host.parse_document(&sprite_markup(&[1, 2], true)).unwrap();
        assert!(host.find_by_id(&root, "frame_2").is_some());
        assert!(host.find_by_id(&root, "background").is_some());
        assert!(host.parse_document("<g/>").is_err());
        assert!(host.parse_document(r#"<svg><g id="a"><rect></g></svg>"#).is_err());
    }
}
