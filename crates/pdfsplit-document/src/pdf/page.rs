// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page handles.

use lopdf::ObjectId;

/// US Letter, used when no page tree node carries a /MediaBox.
pub const DEFAULT_MEDIA_BOX: PageBox = PageBox {
    llx: 0.0,
    lly: 0.0,
    urx: 612.0,
    ury: 792.0,
};

/// A rectangle in PDF user space (points).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub llx: f32,
    pub lly: f32,
    pub urx: f32,
    pub ury: f32,
}

impl PageBox {
    /// Build a box from two arbitrary corners, normalising the order.
    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            llx: x1.min(x2),
            lly: y1.min(y2),
            urx: x1.max(x2),
            ury: y1.max(y2),
        }
    }

    pub fn width(&self) -> f32 {
        self.urx - self.llx
    }

    pub fn height(&self) -> f32 {
        self.ury - self.lly
    }

    /// Common area of two boxes, `None` if they do not overlap.
    pub fn intersect(&self, other: &PageBox) -> Option<PageBox> {
        let clipped = PageBox {
            llx: self.llx.max(other.llx),
            lly: self.lly.max(other.lly),
            urx: self.urx.min(other.urx),
            ury: self.ury.min(other.ury),
        };
        (clipped.width() > 0.0 && clipped.height() > 0.0).then_some(clipped)
    }
}

impl Default for PageBox {
    fn default() -> Self {
        DEFAULT_MEDIA_BOX
    }
}

/// Identifies one page of one [`PdfDocument`](super::PdfDocument).
///
/// A handle is only meaningful together with the document it was obtained
/// from; it does not borrow the document so that it can be passed around
/// while the document is being modified.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfPage {
    /// 0-based position in the page tree.
    pub index: usize,
    /// Object id of the page dictionary.
    pub object_id: ObjectId,
    /// Effective media box, inherited through the page tree if needed.
    pub media_box: PageBox,
    /// Visible area: the crop box clipped to the media box, or the media
    /// box when the page has none.
    pub crop_box: PageBox,
}

impl PdfPage {
    /// Width of the visible area.
    pub fn width(&self) -> f32 {
        self.crop_box.width()
    }

    /// Height of the visible area.
    pub fn height(&self) -> f32 {
        self.crop_box.height()
    }
}
