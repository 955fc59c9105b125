#![cfg(target_arch = "wasm32")]

use std::fmt::Display;
use std::sync::Arc;

use glam::Vec3;
use js_sys::Int32Array;
use wasm_bindgen::prelude::*;

use crate::backend::web::WebHost;
use crate::render::{DEFAULT_FRAGMENT_SHADER, DEFAULT_VERTEX_SHADER};
use crate::{Color, ColorList, Dimension, ObjectId, PointList, Renderer, SceneObject};

#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

fn to_js(err: impl Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// JavaScript-facing renderer bound to the page's document.
#[wasm_bindgen]
pub struct WebRenderer {
    inner: Renderer<WebHost>,
}

#[wasm_bindgen]
impl WebRenderer {
    /// `dimension` is 2 or 3.
    #[wasm_bindgen(constructor)]
    pub fn new(width: u32, height: u32, dimension: u8) -> Result<WebRenderer, JsValue> {
        let dimension = Dimension::try_from(dimension).map_err(to_js)?;
        let host = WebHost::new().map_err(to_js)?;
        Ok(Self {
            inner: Renderer::new(host, dimension, width, height),
        })
    }

    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.inner.width()
    }

    #[wasm_bindgen(setter)]
    pub fn set_width(&mut self, width: u32) {
        self.inner.set_width(width);
    }

    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.inner.height()
    }

    #[wasm_bindgen(setter)]
    pub fn set_height(&mut self, height: u32) {
        self.inner.set_height(height);
    }

    #[wasm_bindgen(getter)]
    pub fn dimension(&self) -> u8 {
        self.inner.dimension().into()
    }

    /// Accepts `#rrggbb` or `#rrggbbaa`.
    #[wasm_bindgen(js_name = setBackgroundColor)]
    pub fn set_background_color(&mut self, hex: &str) -> Result<(), JsValue> {
        let color = Color::from_hex(hex).map_err(to_js)?;
        self.inner.set_background(color);
        Ok(())
    }

    #[wasm_bindgen(js_name = setContainerById)]
    pub fn set_container_by_id(&mut self, id: &str) -> Result<(), JsValue> {
        self.inner.set_container_by_id(id).map_err(to_js)
    }

    pub fn init(&mut self) -> Result<(), JsValue> {
        self.inner.init().map_err(to_js)
    }

    #[wasm_bindgen(js_name = addShaders)]
    pub fn add_shaders(&mut self, vertex_source: &str, fragment_source: &str) -> Result<(), JsValue> {
        self.inner
            .add_shaders(vertex_source, fragment_source)
            .map_err(to_js)
    }

    #[wasm_bindgen(js_name = addDefaultShaders)]
    pub fn add_default_shaders(&mut self) -> Result<(), JsValue> {
        self.add_shaders(DEFAULT_VERTEX_SHADER, DEFAULT_FRAGMENT_SHADER)
    }

    /// `points` holds `x, y, z` triples and `colors` `r, g, b, a` quadruples;
    /// `color`, when given, is a single RGBA quadruple for the whole object.
    #[wasm_bindgen(js_name = addObject)]
    pub fn add_object(
        &mut self,
        name: &str,
        points: &[f32],
        colors: &[f32],
        color: Option<Vec<f32>>,
    ) -> Result<u32, JsValue> {
        if points.len() % 3 != 0 || colors.len() % 4 != 0 {
            return Err(JsValue::from_str(
                "points must be xyz triples and colors rgba quadruples",
            ));
        }
        let points: PointList = points
            .chunks_exact(3)
            .map(|xyz| Vec3::new(xyz[0], xyz[1], xyz[2]))
            .collect();
        let colors: ColorList = colors
            .chunks_exact(4)
            .map(|rgba| Color::new(rgba[0], rgba[1], rgba[2], rgba[3]))
            .collect();
        let mut object = SceneObject::mesh(name, points).with_colors(colors);
        if let Some(rgba) = color {
            let [r, g, b, a] = <[f32; 4]>::try_from(rgba.as_slice())
                .map_err(|_| JsValue::from_str("color must be an rgba quadruple"))?;
            object = object.with_color(Color::new(r, g, b, a));
        }
        let id = self.inner.add_object(Arc::new(object)).map_err(to_js)?;
        Ok(id.get())
    }

    #[wasm_bindgen(js_name = removeObject)]
    pub fn remove_object(&mut self, id: u32) -> bool {
        self.inner.remove_object(ObjectId::new(id))
    }

    pub fn render(&self) -> Result<(), JsValue> {
        self.inner.render().map_err(to_js)
    }

    /// Returns `[x, y]` in surface pixels.
    #[wasm_bindgen(js_name = convertWorldToDisplayCoordinates)]
    pub fn world_to_display(&self, x: f32, y: f32, z: f32) -> Result<Int32Array, JsValue> {
        let pixel = self
            .inner
            .world_to_display(Vec3::new(x, y, z))
            .map_err(to_js)?;
        Ok(Int32Array::from(pixel.to_array().as_slice()))
    }

    /// Rotates the camera around its target; angles in radians.
    #[wasm_bindgen(js_name = orbitCamera)]
    pub fn orbit_camera(&mut self, yaw: f32, pitch: f32) {
        if let Some(camera) = self.inner.camera_mut() {
            camera.orbit(yaw, pitch);
        }
    }
}
