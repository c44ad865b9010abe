//! Framing data model shared by the per-section calculator and the merge
//! engine.

pub mod basic;
pub mod calculator;

use serde::{Deserialize, Serialize};

use crate::math::{px_to_ft, Point2, Vector2, PIXELS_PER_FOOT};

pub use basic::BasicFramer;
pub use calculator::{
    ledger_edge_on_walls, orient_section, section_dimensions, AngledBeam, AngledBeamRequest, BeamTrim,
    BeamTrimRequest, FramingCalculator, SectionDims,
};

/// Members shorter than this are logically removed.
pub const MIN_MEMBER_LENGTH_FT: f64 = 0.1;

/// Kind of a linear framing member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    Beam,
    Joist,
    RimJoist,
    Blocking,
}

/// Role of a member within its section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Usage {
    #[default]
    Standard,
    /// Beam along the edge away from the ledger.
    Outer,
    /// Beam along the house side of a freestanding section.
    WallSide,
    Diagonal,
}

impl Usage {
    /// Whether two beams with these usages may merge across a section seam.
    #[must_use]
    pub fn is_compatible_with(self, other: Usage) -> bool {
        self == other
            || matches!(
                (self, other),
                (Usage::Outer, Usage::WallSide) | (Usage::WallSide, Usage::Outer)
            )
    }
}

/// Marker flags attached to members by the merge engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MemberFlags {
    /// Member follows a non-axis-aligned perimeter edge.
    pub diagonal: bool,
    /// Member is the union of fragments from several sections.
    pub merged: bool,
    /// Member lies entirely outside a diagonal edge but was kept.
    pub anomalous: bool,
}

/// A beam, joist, rim joist, or blocking piece in plan.
///
/// Endpoints are only mutable through [`StructuralMember::set_endpoints`],
/// which keeps `length_ft` equal to the endpoint distance in feet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuralMember {
    pub kind: MemberKind,
    p1: Point2,
    p2: Point2,
    length_ft: f64,
    pub size: String,
    pub usage: Usage,
    pub ply: Option<u8>,
    pub section_id: Option<usize>,
    centerline: Option<(Point2, Point2)>,
    pub flags: MemberFlags,
}

impl StructuralMember {
    /// Creates a member with [`Usage::Standard`].
    #[must_use]
    pub fn new(kind: MemberKind, p1: Point2, p2: Point2, size: impl Into<String>) -> Self {
        Self {
            kind,
            p1,
            p2,
            length_ft: px_to_ft(nalgebra::distance(&p1, &p2)),
            size: size.into(),
            usage: Usage::Standard,
            ply: None,
            section_id: None,
            centerline: None,
            flags: MemberFlags::default(),
        }
    }

    #[must_use]
    pub fn beam(p1: Point2, p2: Point2, size: impl Into<String>) -> Self {
        Self::new(MemberKind::Beam, p1, p2, size)
    }

    #[must_use]
    pub fn joist(p1: Point2, p2: Point2, size: impl Into<String>) -> Self {
        Self::new(MemberKind::Joist, p1, p2, size)
    }

    #[must_use]
    pub fn rim_joist(p1: Point2, p2: Point2, size: impl Into<String>) -> Self {
        Self::new(MemberKind::RimJoist, p1, p2, size)
    }

    #[must_use]
    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = usage;
        self
    }

    #[must_use]
    pub fn with_ply(mut self, ply: u8) -> Self {
        self.ply = Some(ply);
        self
    }

    /// Attaches an explicit centerline distinct from the drawn endpoints.
    #[must_use]
    pub fn with_centerline(mut self, start: Point2, end: Point2) -> Self {
        self.centerline = Some((start, end));
        self
    }

    #[must_use]
    pub fn p1(&self) -> Point2 {
        self.p1
    }

    #[must_use]
    pub fn p2(&self) -> Point2 {
        self.p2
    }

    #[must_use]
    pub fn length_ft(&self) -> f64 {
        self.length_ft
    }

    #[must_use]
    pub fn length_px(&self) -> f64 {
        self.length_ft * PIXELS_PER_FOOT
    }

    #[must_use]
    pub fn midpoint(&self) -> Point2 {
        nalgebra::center(&self.p1, &self.p2)
    }

    /// Centerline used for support placement; falls back to the endpoints.
    #[must_use]
    pub fn centerline(&self) -> (Point2, Point2) {
        self.centerline.unwrap_or((self.p1, self.p2))
    }

    /// Moves both endpoints, recomputing the length. An explicit centerline
    /// no longer matches the new geometry and is dropped.
    pub fn set_endpoints(&mut self, p1: Point2, p2: Point2) {
        self.p1 = p1;
        self.p2 = p2;
        self.length_ft = px_to_ft(nalgebra::distance(&p1, &p2));
        self.centerline = None;
    }

    /// Unit direction `p1 -> p2`, or `None` for a zero-length member.
    #[must_use]
    pub fn direction(&self) -> Option<Vector2> {
        let d = self.p2 - self.p1;
        let len = d.norm();
        (len > 1e-10).then(|| d / len)
    }

    /// Runs along x within one foot of drift.
    #[must_use]
    pub fn is_horizontal(&self) -> bool {
        (self.p2.y - self.p1.y).abs() < PIXELS_PER_FOOT
    }

    /// Runs along y within one foot of drift.
    #[must_use]
    pub fn is_vertical(&self) -> bool {
        (self.p2.x - self.p1.x).abs() < PIXELS_PER_FOOT
    }

    #[must_use]
    pub fn is_removed(&self) -> bool {
        self.length_ft < MIN_MEMBER_LENGTH_FT
    }
}

/// Foundation type placed under each post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FootingType {
    #[default]
    Concrete,
    Helical,
    Block,
}

/// How the main beam relates to the joists it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeamType {
    /// Joists bear on top of the beam and cantilever past it.
    #[default]
    Drop,
    /// Dropped beam placed directly under the rim, no cantilever.
    DropAtRim,
    /// Beam in the joist plane, joists hung from its face.
    Flush,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub position: Point2,
    pub size: String,
    pub height_ft: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Footing {
    pub position: Point2,
    pub kind: FootingType,
}

/// How a ledger was assembled from section fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerCombination {
    #[default]
    None,
    /// Collinear fragments extended into one segment.
    Extended,
    /// Non-collinear fragments; `length_ft` is the total of all fragments and
    /// the geometry is that of the first one.
    LShaped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    pub p1: Point2,
    pub p2: Point2,
    pub length_ft: f64,
    pub section_id: Option<usize>,
    pub combination: LedgerCombination,
}

impl Ledger {
    #[must_use]
    pub fn new(p1: Point2, p2: Point2) -> Self {
        Self {
            p1,
            p2,
            length_ft: px_to_ft(nalgebra::distance(&p1, &p2)),
            section_id: None,
            combination: LedgerCombination::None,
        }
    }

    #[must_use]
    pub fn is_horizontal(&self) -> bool {
        (self.p2.x - self.p1.x).abs() >= (self.p2.y - self.p1.y).abs()
    }
}

/// One rectangle of the decomposed footprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectangularSection {
    pub corners: Vec<Point2>,
    #[serde(default)]
    pub is_ledger_rectangle: bool,
    /// Edge indices into `corners` that bear on the house wall.
    #[serde(default)]
    pub ledger_walls: Vec<usize>,
}

impl RectangularSection {
    #[must_use]
    pub fn new(corners: Vec<Point2>) -> Self {
        Self {
            corners,
            is_ledger_rectangle: false,
            ledger_walls: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_ledger_wall(mut self, edge: usize) -> Self {
        self.ledger_walls.push(edge);
        self.is_ledger_rectangle = true;
        self
    }

    /// Whether this section's ledger takes part in the combined deck ledger.
    #[must_use]
    pub fn contributes_to_ledger(&self) -> bool {
        !self.ledger_walls.is_empty() || self.is_ledger_rectangle
    }
}

/// Framing computed for a single rectangle, geometrically unaware of its
/// neighbours.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionFraming {
    pub ledger: Option<Ledger>,
    pub beams: Vec<StructuralMember>,
    pub joists: Vec<StructuralMember>,
    pub rim_joists: Vec<StructuralMember>,
    pub posts: Vec<Post>,
    pub footings: Vec<Footing>,
    pub mid_span_blocking: Vec<StructuralMember>,
    pub picture_frame_blocking: Vec<StructuralMember>,
}

impl SectionFraming {
    /// Stamps `section_id` on the ledger and every member.
    pub fn tag_section(&mut self, section_id: usize) {
        if let Some(ledger) = self.ledger.as_mut() {
            ledger.section_id = Some(section_id);
        }
        for member in self
            .beams
            .iter_mut()
            .chain(self.joists.iter_mut())
            .chain(self.rim_joists.iter_mut())
            .chain(self.mid_span_blocking.iter_mut())
            .chain(self.picture_frame_blocking.iter_mut())
        {
            member.section_id = Some(section_id);
        }
    }
}

/// Boundary-correct framing for the whole footprint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergedStructure {
    pub ledger: Option<Ledger>,
    pub beams: Vec<StructuralMember>,
    pub joists: Vec<StructuralMember>,
    pub rim_joists: Vec<StructuralMember>,
    pub posts: Vec<Post>,
    pub footings: Vec<Footing>,
    pub mid_span_blocking: Vec<StructuralMember>,
    pub picture_frame_blocking: Vec<StructuralMember>,
}
