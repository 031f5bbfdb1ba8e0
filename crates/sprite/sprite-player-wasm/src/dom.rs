//! Browser host: `DOMParser` render tree, `fetch` assets, DOM stage.

use core::future::Future;

use wasm_bindgen::JsCast;
use web_sys::{Document, DomParser, Element, HtmlElement, SupportedType};

use sprite_player_core::{
    AssetSource, Config, ContainerAttributes, Cooperative, Opacity, PlayerError, RenderTree,
    Result, SpriteNode, Stage,
};

use crate::fetch::{describe, fetch_text, next_task};
use crate::overlay::LoadingOverlay;
use crate::raf::next_animation_frame;

const PREVIEW_CLASS: &str = "svg-preview";
const ROOT_STYLE: &str = "position: relative; top: 0; left: 0; width: 100%; height: 100%;";

/// Element handle owned by a player.
#[derive(Clone, Debug)]
pub struct DomNode(pub Element);

impl SpriteNode for DomNode {
    fn set_opacity(&self, opacity: Opacity) {
        let _ = self.0.set_attribute("opacity", opacity.as_attr());
    }

    fn set_visible(&self, visible: bool) {
        let _ = if visible {
            self.0.remove_attribute("visibility")
        } else {
            self.0.set_attribute("visibility", "hidden")
        };
    }
}

pub struct DomHost {
    document: Document,
    parser: DomParser,
    overlay_cleanup_delay_ms: u32,
}

impl DomHost {
    pub fn new(document: Document, config: &Config) -> Result<Self> {
        let parser = DomParser::new().map_err(|e| PlayerError::render_tree(describe(&e)))?;
        Ok(Self {
            document,
            parser,
            overlay_cleanup_delay_ms: config.overlay_cleanup_delay_ms,
        })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Containers matching `selector` with their `data-id`/`data-base-path`.
    pub fn discover(&self, selector: &str) -> Result<Vec<(Element, ContainerAttributes)>> {
        let nodes = self
            .document
            .query_selector_all(selector)
            .map_err(|e| PlayerError::render_tree(describe(&e)))?;
        let mut found = Vec::with_capacity(nodes.length() as usize);
        for i in 0..nodes.length() {
            let Some(element) = nodes.item(i).and_then(|n| n.dyn_into::<HtmlElement>().ok())
            else {
                continue;
            };
            let data = element.dataset();
            let attrs = ContainerAttributes {
                id: data.get("id"),
                base_path: data.get("basePath"),
            };
            found.push((element.unchecked_into::<Element>(), attrs));
        }
        Ok(found)
    }
}

impl AssetSource for DomHost {
    fn fetch_text(
        &self,
        path: &str,
    ) -> impl Future<Output = core::result::Result<String, String>> {
        let path = path.to_string();
        async move { fetch_text(&path).await }
    }
}

impl Cooperative for DomHost {
    fn yield_now(&self) -> impl Future<Output = ()> {
        next_task()
    }
}

impl RenderTree for DomHost {
    type Node = DomNode;

    fn parse_document(&self, markup: &str) -> Result<DomNode> {
        let doc = self
            .parser
            .parse_from_string(markup, SupportedType::ImageSvgXml)
            .map_err(|e| PlayerError::render_tree(describe(&e)))?;
        if doc.get_elements_by_tag_name("parsererror").length() > 0 {
            return Err(PlayerError::render_tree("markup is not well-formed SVG"));
        }
        doc.document_element()
            .map(DomNode)
            .ok_or_else(|| PlayerError::render_tree("document has no root element"))
    }

    fn find_by_id(&self, root: &DomNode, id: &str) -> Option<DomNode> {
        root.0
            .query_selector(&format!("[id=\"{id}\"]"))
            .ok()
            .flatten()
            .map(DomNode)
    }

    fn append_child(&self, parent: &DomNode, child: &DomNode) -> Result<()> {
        parent
            .0
            .append_child(&child.0)
            .map(|_| ())
            .map_err(|e| PlayerError::render_tree(describe(&e)))
    }
}

impl Stage for DomHost {
    type Container = Element;
    type Indicator = LoadingOverlay;

    fn show_preview(&self, container: &Element, markup: &str) -> Result<()> {
        let preview = self.parse_document(markup)?.0;
        let _ = preview.set_attribute("width", "100%");
        let _ = preview.set_attribute("height", "100%");
        let _ = preview.set_attribute("style", "display: block;");
        let _ = preview.class_list().add_1(PREVIEW_CLASS);
        container
            .append_child(&preview)
            .map(|_| ())
            .map_err(|e| PlayerError::render_tree(describe(&e)))
    }

    fn mount(&self, container: &Element, root: &DomNode) -> impl Future<Output = Result<()>> {
        let container = container.clone();
        let root = root.clone();
        async move {
            next_animation_frame().await;
            let preview = container
                .query_selector(&format!(".{PREVIEW_CLASS}"))
                .ok()
                .flatten();
            let _ = root.0.set_attribute("style", ROOT_STYLE);
            container
                .append_child(&root.0)
                .map_err(|e| PlayerError::Mount {
                    reason: describe(&e),
                })?;
            root.set_visible(true);
            if let Some(preview) = preview {
                preview.remove();
            }
            Ok(())
        }
    }

    fn loading_indicator(&self, container: &Element) -> LoadingOverlay {
        LoadingOverlay::new(&self.document, container, self.overlay_cleanup_delay_ms)
    }
}
