//! Drag-and-drop payloads and canvas geometry

use crate::{Component, CssRule, Instance, InstanceId, UserProps};
use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Bounding box in canvas pixels, DOMRect-shaped on the wire
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Build from the vertical/horizontal extents
    pub fn from_edges(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self::new(left, top, right - left, bottom - top)
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left
            && point.x <= self.right()
            && point.y >= self.top
            && point.y <= self.bottom()
    }

    /// Euclidean distance from `point` to the box; zero inside it
    pub fn distance_to(&self, point: Point) -> f64 {
        let dx = (self.left - point.x).max(0.0).max(point.x - self.right());
        let dy = (self.top - point.y).max(0.0).max(point.y - self.bottom());
        (dx * dx + dy * dy).sqrt()
    }
}

/// Where an instance lands inside its new parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Index(usize),
    End,
}

impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Position::Index(index) => serializer.serialize_u64(*index as u64),
            Position::End => serializer.serialize_str("end"),
        }
    }
}

impl<'de> Deserialize<'de> for Position {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PositionVisitor;

        impl Visitor<'_> for PositionVisitor {
            type Value = Position;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a child index or \"end\"")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Position, E> {
                Ok(Position::Index(v as usize))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Position, E> {
                Ok(Position::Index(v.max(0) as usize))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Position, E> {
                match v {
                    "end" => Ok(Position::End),
                    other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
                }
            }
        }

        deserializer.deserialize_any(PositionVisitor)
    }
}

/// Id and component of an instance, without its subtree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceRef {
    pub id: InstanceId,
    pub component: Component,
}

impl From<&Instance> for InstanceRef {
    fn from(instance: &Instance) -> Self {
        Self {
            id: instance.id.clone(),
            component: instance.component,
        }
    }
}

/// Payload of `selectInstance` / `hoverInstance`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedInstance {
    pub id: InstanceId,
    pub component: Component,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css_rules: Option<Vec<CssRule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub props: Option<UserProps>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragData {
    pub instance: Instance,
    pub current_offset: Point,
}

/// Resolved drop target: the parent instance and the slot inside it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropData {
    pub instance: InstanceRef,
    pub position: Position,
}

impl DropData {
    pub fn parent_id(&self) -> &str {
        &self.instance.id
    }
}
