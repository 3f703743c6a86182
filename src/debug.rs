use crate::math::Point2d;
#[cfg(feature = "debug")]
use serde_json::json;

#[cfg(feature = "debug")]
thread_local!(
    static DEBUG_FRAME: std::cell::RefCell<Vec<serde_json::Value>> = Default::default();
);

#[allow(unused)]
pub fn debug_boundary(name: &str, boundary: &[Point2d]) {
    #[cfg(feature = "debug")]
    DEBUG_FRAME.with(|frame| {
        frame.borrow_mut().push(json!({
            "type": "boundary",
            "name": name,
            "points": boundary.iter().map(|p| [p.x, p.y]).collect::<Vec<_>>(),
        }))
    })
}

#[allow(unused)]
pub fn debug_hazard(ego: crate::ActorId, other: crate::ActorId, margin: f64) {
    #[cfg(feature = "debug")]
    DEBUG_FRAME.with(|frame| {
        frame.borrow_mut().push(json!({
            "type": "hazard",
            "ego": ego.0,
            "other": other.0,
            "margin": margin,
        }))
    })
}

#[cfg(feature = "debug")]
pub fn take_debug_frame() -> serde_json::Value {
    json!(DEBUG_FRAME.with(|frame| frame.take()))
}
