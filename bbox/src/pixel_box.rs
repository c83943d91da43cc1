use crate::common::*;
use crate::Hw;

/// Corner-form bounding box in (xmin, ymin, xmax, ymax) order.
///
/// Coordinate order is not validated; inverted boxes pass through unchanged so
/// malformed source annotations keep their original values downstream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PixelBox<T> {
    pub(crate) xmin: T,
    pub(crate) ymin: T,
    pub(crate) xmax: T,
    pub(crate) ymax: T,
}

impl<T> PixelBox<T> {
    pub fn try_cast<V>(self) -> Option<PixelBox<V>>
    where
        T: ToPrimitive,
        V: NumCast,
    {
        Some(PixelBox {
            xmin: V::from(self.xmin)?,
            ymin: V::from(self.ymin)?,
            xmax: V::from(self.xmax)?,
            ymax: V::from(self.ymax)?,
        })
    }

    pub fn cast<V>(self) -> PixelBox<V>
    where
        T: ToPrimitive,
        V: NumCast,
    {
        self.try_cast().unwrap()
    }
}

impl<T> PixelBox<T>
where
    T: Copy + Num + PartialOrd,
{
    pub fn from_xyxy(xyxy: [T; 4]) -> Self {
        let [xmin, ymin, xmax, ymax] = xyxy;
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Build from the COCO (left, top, width, height) form.
    pub fn from_xywh(xywh: [T; 4]) -> Self {
        let [x, y, w, h] = xywh;
        Self::from_xyxy([x, y, x + w, y + h])
    }

    pub fn xmin(&self) -> T {
        self.xmin
    }

    pub fn ymin(&self) -> T {
        self.ymin
    }

    pub fn xmax(&self) -> T {
        self.xmax
    }

    pub fn ymax(&self) -> T {
        self.ymax
    }

    pub fn w(&self) -> T {
        self.xmax - self.xmin
    }

    pub fn h(&self) -> T {
        self.ymax - self.ymin
    }

    pub fn area(&self) -> T {
        self.w() * self.h()
    }

    pub fn xyxy(&self) -> [T; 4] {
        [self.xmin, self.ymin, self.xmax, self.ymax]
    }

    /// Multiply every coordinate by a single scale factor.
    pub fn scale(&self, scale: T) -> Self {
        Self {
            xmin: self.xmin * scale,
            ymin: self.ymin * scale,
            xmax: self.xmax * scale,
            ymax: self.ymax * scale,
        }
    }

    /// Clamp mins to zero and maxes to the given extents.
    pub fn clamp_to(&self, size: &Hw<T>) -> Self {
        let zero = T::zero();
        Self {
            xmin: if self.xmin < zero { zero } else { self.xmin },
            ymin: if self.ymin < zero { zero } else { self.ymin },
            xmax: if self.xmax > size.w() { size.w() } else { self.xmax },
            ymax: if self.ymax > size.h() { size.h() } else { self.ymax },
        }
    }
}
