use std::{
    io::Write,
    path::{Path, PathBuf},
};

use image::{Rgba, RgbaImage};
use serde::Serialize;

use crate::{
    Error, Heading, Result,
    config::{OutputFormat, Theme},
    rotate::rotate,
};

/// The arrow artwork points north-east; turning it once by this much at load
/// time makes it point north.
pub const ASSET_OFFSET_DEGREES: f64 = 45.0;

pub const LIGHT_ARROW_FILE: &str = "arrow_light.png";
pub const DARK_ARROW_FILE: &str = "arrow_dark.png";

/// Edge length of the arrow drawn when no artwork is supplied.
pub const GENERATED_ARROW_SIZE: u32 = 100;

/// Ink for the light theme (dark arrow on a light background) and vice versa.
const LIGHT_INK: Rgba<u8> = Rgba([32, 32, 32, 255]);
const DARK_INK: Rgba<u8> = Rgba([230, 230, 230, 255]);

/// Arrow artwork for both themes, already turned to point north.
#[derive(Debug, Clone)]
pub struct ArrowSet {
    light: RgbaImage,
    dark: RgbaImage,
}

impl ArrowSet {
    /// Takes north-east pointing artwork and turns it to point north. The
    /// canvas grows so no part of the arrow is cut off.
    #[must_use]
    pub fn new(light: &RgbaImage, dark: &RgbaImage) -> Self {
        Self {
            light: rotate(light, ASSET_OFFSET_DEGREES, true),
            dark: rotate(dark, ASSET_OFFSET_DEGREES, true),
        }
    }

    /// Load `arrow_light.png` and `arrow_dark.png` from `dir`.
    pub fn load(dir: &Path) -> Result<Self> {
        let light = load_image(&dir.join(LIGHT_ARROW_FILE))?;
        let dark = load_image(&dir.join(DARK_ARROW_FILE))?;
        Ok(Self::new(&light, &dark))
    }

    /// A plain drawn arrow, for running without artwork.
    #[must_use]
    pub fn generated(size: u32) -> Self {
        Self::new(&draw_arrow(size, LIGHT_INK), &draw_arrow(size, DARK_INK))
    }

    pub fn light(&self) -> &RgbaImage {
        &self.light
    }

    pub fn dark(&self) -> &RgbaImage {
        &self.dark
    }

    /// Turn both arrows to `heading`. The canvas never changes size.
    #[must_use]
    pub fn render(&self, heading: Heading) -> Frame {
        let degrees = f64::from(heading.degrees());
        Frame {
            heading,
            light: rotate(&self.light, degrees, false),
            dark: rotate(&self.dark, degrees, false),
        }
    }
}

fn load_image(path: &Path) -> Result<RgbaImage> {
    image::open(path)
        .map(|image| image.to_rgba8())
        .map_err(|source| Error::Asset {
            path: PathBuf::from(path),
            source,
        })
}

/// North-east pointing arrow: a diagonal shaft with a head in the top right
/// corner.
fn draw_arrow(size: u32, ink: Rgba<u8>) -> RgbaImage {
    let size = size.max(3);
    let last = i64::from(size) - 1;
    let head = i64::from(size) / 3;
    let half_width = (i64::from(size) / 25).max(1);

    RgbaImage::from_fn(size, size, |x, y| {
        let (x, y) = (i64::from(x), i64::from(y));
        let on_shaft = (x + y - last).abs() <= half_width;
        let in_head = (last - x) + y <= head;
        if on_shaft || in_head {
            ink
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

/// One rendered state of the display.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub heading: Heading,
    pub light: RgbaImage,
    pub dark: RgbaImage,
}

impl Frame {
    /// The numeric readout shown under the arrow.
    #[must_use]
    pub fn label(&self) -> String {
        self.heading.to_string()
    }
}

/// Where frames end up. Toolkit front ends implement this; the render loop
/// never sees a widget.
pub trait DisplaySurface {
    fn present(&mut self, frame: &Frame) -> Result<()>;
}

impl<D: DisplaySurface + ?Sized> DisplaySurface for Box<D> {
    fn present(&mut self, frame: &Frame) -> Result<()> {
        (**self).present(frame)
    }
}

#[derive(Serialize)]
struct FrameSummary<'a> {
    heading: Heading,
    label: &'a str,
    width: u32,
    height: u32,
}

/// Headless display that writes a line whenever the readout changes.
pub struct TerminalDisplay<W> {
    out: W,
    format: OutputFormat,
    shown: Option<Heading>,
}

impl<W: Write> TerminalDisplay<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self {
            out,
            format,
            shown: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> DisplaySurface for TerminalDisplay<W> {
    fn present(&mut self, frame: &Frame) -> Result<()> {
        if self.shown == Some(frame.heading) {
            return Ok(());
        }

        let label = frame.label();
        match self.format {
            OutputFormat::Text => writeln!(self.out, "heading {label}").map_err(Error::Display)?,
            OutputFormat::Json => {
                let (width, height) = frame.light.dimensions();
                let summary = FrameSummary {
                    heading: frame.heading,
                    label: &label,
                    width,
                    height,
                };
                serde_json::to_writer(&mut self.out, &summary)?;
                writeln!(self.out).map_err(Error::Display)?;
            }
        }
        self.out.flush().map_err(Error::Display)?;

        self.shown = Some(frame.heading);
        Ok(())
    }
}

/// Passes frames on to another display and saves the arrow of one theme as
/// a PNG whenever the heading changes.
pub struct SnapshotDisplay<D> {
    inner: D,
    path: PathBuf,
    theme: Theme,
    saved: Option<Heading>,
}

impl<D: DisplaySurface> SnapshotDisplay<D> {
    pub fn new(inner: D, path: impl Into<PathBuf>, theme: Theme) -> Self {
        Self {
            inner,
            path: path.into(),
            theme,
            saved: None,
        }
    }

    pub fn into_inner(self) -> D {
        self.inner
    }
}

impl<D: DisplaySurface> DisplaySurface for SnapshotDisplay<D> {
    fn present(&mut self, frame: &Frame) -> Result<()> {
        self.inner.present(frame)?;

        if self.saved == Some(frame.heading) {
            return Ok(());
        }

        let image = match self.theme {
            Theme::Light => &frame.light,
            Theme::Dark => &frame.dark,
        };
        image.save(&self.path).map_err(|source| Error::Snapshot {
            path: self.path.clone(),
            source,
        })?;

        self.saved = Some(frame.heading);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assets_are_turned_once_with_a_grown_canvas() {
        let arrows = ArrowSet::generated(GENERATED_ARROW_SIZE);
        assert_eq!(arrows.light().dimensions(), (142, 142));
        assert_eq!(arrows.dark().dimensions(), (142, 142));
    }

    #[test]
    fn generated_arrow_points_north() {
        let arrows = ArrowSet::generated(GENERATED_ARROW_SIZE);
        let (width, height) = arrows.light().dimensions();
        let column = width / 2;

        // The tip sits near the top of the centre column, the tail near the bottom.
        let opaque: Vec<u32> = (0..height)
            .filter(|&y| arrows.light().get_pixel(column, y).0[3] > 0)
            .collect();
        let top = opaque.first().copied().unwrap();
        let bottom = opaque.last().copied().unwrap();
        assert!(top < height / 4, "tip at {top}");
        assert!(bottom > height * 3 / 4, "tail at {bottom}");
    }

    #[test]
    fn rendering_is_a_pure_function_of_heading() {
        let arrows = ArrowSet::generated(48);
        let heading = Heading::from_degrees(217);
        let first = arrows.render(heading);
        let second = arrows.render(heading);
        assert_eq!(first, second);
        assert_eq!(first.light.dimensions(), arrows.light().dimensions());
        assert_eq!(first.label(), "217");
    }

    #[test]
    fn north_renders_the_asset_unchanged() {
        let arrows = ArrowSet::generated(48);
        let frame = arrows.render(Heading::NORTH);
        assert_eq!(&frame.light, arrows.light());
        assert_eq!(&frame.dark, arrows.dark());
    }

    #[test]
    fn missing_assets_are_reported() {
        let err = ArrowSet::load(Path::new("/nonexistent/arrows")).unwrap_err();
        assert!(matches!(err, Error::Asset { ref path, .. } if path.ends_with(LIGHT_ARROW_FILE)));
    }

    #[test]
    fn text_display_prints_only_changes() {
        let arrows = ArrowSet::generated(16);
        let mut display = TerminalDisplay::new(Vec::new(), OutputFormat::Text);
        for degrees in [0, 0, 90, 90, 0] {
            display.present(&arrows.render(Heading::from_degrees(degrees))).unwrap();
        }
        let out = String::from_utf8(display.into_inner()).unwrap();
        assert_eq!(out, "heading 0\nheading 90\nheading 0\n");
    }

    #[test]
    fn json_display_writes_one_object_per_line() {
        let arrows = ArrowSet::generated(16);
        let mut display = TerminalDisplay::new(Vec::new(), OutputFormat::Json);
        display.present(&arrows.render(Heading::from_degrees(270))).unwrap();

        let out = String::from_utf8(display.into_inner()).unwrap();
        let (width, height) = arrows.light().dimensions();
        let value: serde_json::Value = serde_json::from_str(out.trim_end()).unwrap();
        assert_eq!(value["heading"], 270);
        assert_eq!(value["label"], "270");
        assert_eq!(value["width"], width);
        assert_eq!(value["height"], height);
    }

    fn snapshot_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("imu-heading-{}-{name}.png", std::process::id()))
    }

    #[test]
    fn snapshot_holds_the_latest_arrow() {
        let arrows = ArrowSet::generated(16);
        let path = snapshot_path("latest");
        let terminal = TerminalDisplay::new(Vec::new(), OutputFormat::Text);
        let mut display = SnapshotDisplay::new(terminal, &path, Theme::Dark);

        display.present(&arrows.render(Heading::from_degrees(10))).unwrap();
        let east = arrows.render(Heading::from_degrees(90));
        display.present(&east).unwrap();
        display.present(&east).unwrap();

        let saved = image::open(&path).unwrap().to_rgba8();
        assert_eq!(saved, east.dark);

        let out = String::from_utf8(display.into_inner().into_inner()).unwrap();
        assert_eq!(out, "heading 10\nheading 90\n");
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn unwritable_snapshot_is_reported() {
        let arrows = ArrowSet::generated(16);
        let terminal = TerminalDisplay::new(Vec::new(), OutputFormat::Text);
        let mut display =
            SnapshotDisplay::new(terminal, "/nonexistent/dir/arrow.png", Theme::Light);

        let err = display.present(&arrows.render(Heading::NORTH)).unwrap_err();
        assert!(matches!(err, Error::Snapshot { .. }));
    }
}
