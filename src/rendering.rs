//! Render surface abstraction and the SVG frame writer.
//!
//! The pipeline hands full shape lists to a surface every tick; the surface
//! owns per-element lifecycle through a keyed join (replace the group,
//! reconcile by key). The shipped surface serializes each frame to an SVG
//! document in a capture directory.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use crate::geometry::{CircleDescriptor, PathDescriptor, Shape};

/// Declarative render target consumed by the pipeline.
pub trait Surface {
    fn set_background(&mut self, color: &str);

    /// Replace the named group's shapes; reconciliation by shape key is the
    /// surface's concern, not the caller's
    fn join(&mut self, group: &str, shapes: Vec<Shape>);

    /// Flush the current frame (no-op for retained surfaces)
    fn present(&mut self, _tick: u64) -> io::Result<()> {
        Ok(())
    }
}

/// SVG-writing surface: one document per presented tick.
pub struct SvgSurface {
    width: f32,
    height: f32,
    view_box: [f32; 4],
    background: String,
    groups: BTreeMap<String, Vec<Shape>>,
    frames_dir: PathBuf,
}

impl SvgSurface {
    pub fn new(width: f32, height: f32, view_box: [f32; 4], frames_dir: PathBuf) -> io::Result<Self> {
        fs::create_dir_all(&frames_dir)?;
        Ok(Self {
            width,
            height,
            view_box,
            background: "black".to_string(),
            groups: BTreeMap::new(),
            frames_dir,
        })
    }

    fn path_markup(path: &PathDescriptor) -> String {
        let mut attrs = format!(" d=\"{}\"", path.d);
        if let Some(fill) = &path.fill {
            attrs.push_str(&format!(" fill=\"{fill}\""));
        } else {
            attrs.push_str(" fill=\"none\"");
        }
        if let Some(stroke) = &path.stroke {
            attrs.push_str(&format!(" stroke=\"{stroke}\""));
        }
        if let Some(width) = path.stroke_width {
            attrs.push_str(&format!(" stroke-width=\"{width:.2}\""));
        }
        if let Some(opacity) = path.stroke_opacity {
            attrs.push_str(&format!(" stroke-opacity=\"{opacity:.2}\""));
        }
        format!("<path{attrs}/>")
    }

    fn circle_markup(circle: &CircleDescriptor) -> String {
        format!(
            "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{:.2}\" fill=\"{}\"/>",
            circle.cx, circle.cy, circle.r, circle.fill
        )
    }

    fn document(&self) -> String {
        let mut svg = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{}\" height=\"{}\" \
             viewBox=\"{} {} {} {}\" style=\"background-color:{}\">\n",
            self.width,
            self.height,
            self.view_box[0],
            self.view_box[1],
            self.view_box[2],
            self.view_box[3],
            self.background
        );
        for (name, shapes) in &self.groups {
            svg.push_str(&format!("<g class=\"{name}\">\n"));
            for shape in shapes {
                let markup = match shape {
                    Shape::Path(path) => Self::path_markup(path),
                    Shape::Circle(circle) => Self::circle_markup(circle),
                };
                svg.push_str(&markup);
                svg.push('\n');
            }
            svg.push_str("</g>\n");
        }
        svg.push_str("</svg>\n");
        svg
    }
}

impl Surface for SvgSurface {
    fn set_background(&mut self, color: &str) {
        self.background = color.to_string();
    }

    fn join(&mut self, group: &str, shapes: Vec<Shape>) {
        self.groups.insert(group.to_string(), shapes);
    }

    fn present(&mut self, tick: u64) -> io::Result<()> {
        let path = self.frames_dir.join(format!("frame_{tick:06}.svg"));
        fs::write(path, self.document())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PathDescriptor;

    fn shape(key: &str) -> Shape {
        Shape::Path(PathDescriptor {
            key: key.to_string(),
            d: "M0,0L1,1Z".to_string(),
            fill: Some("#ffffff".to_string()),
            stroke: None,
            stroke_width: None,
            stroke_opacity: None,
        })
    }

    #[test]
    fn test_svg_document_contains_groups_and_shapes() {
        let dir = std::env::temp_dir().join("soundloom-svg-test");
        let mut surface = SvgSurface::new(100.0, 60.0, [0.0, 0.0, 100.0, 60.0], dir).unwrap();
        surface.set_background("black");
        surface.join("areas", vec![shape("a"), shape("b")]);

        let doc = surface.document();
        assert!(doc.contains("<g class=\"areas\">"));
        assert_eq!(doc.matches("<path").count(), 2);
        assert!(doc.contains("viewBox=\"0 0 100 60\""));
        assert!(doc.contains("background-color:black"));
    }

    #[test]
    fn test_join_replaces_group() {
        let dir = std::env::temp_dir().join("soundloom-svg-test-replace");
        let mut surface = SvgSurface::new(100.0, 60.0, [0.0, 0.0, 100.0, 60.0], dir).unwrap();
        surface.join("areas", vec![shape("a"), shape("b")]);
        surface.join("areas", vec![shape("c")]);

        assert_eq!(surface.document().matches("<path").count(), 1);
    }
}
