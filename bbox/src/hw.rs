use crate::common::*;

/// A height/width pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hw<T> {
    h: T,
    w: T,
}

impl<T> Hw<T> {
    pub fn try_cast<U>(self) -> Option<Hw<U>>
    where
        T: ToPrimitive,
        U: NumCast,
    {
        Some(Hw {
            h: U::from(self.h)?,
            w: U::from(self.w)?,
        })
    }

    pub fn cast<U>(self) -> Hw<U>
    where
        T: ToPrimitive,
        U: NumCast,
    {
        self.try_cast().unwrap()
    }
}

impl<T> Hw<T>
where
    T: Num + PartialOrd + Copy,
{
    pub fn try_from_hw(hw: [T; 2]) -> Result<Self> {
        let [h, w] = hw;
        let zero = T::zero();
        ensure!(
            h >= zero && w >= zero,
            "height and width parameters must be non-negative"
        );
        Ok(Self { h, w })
    }

    pub fn from_hw(hw: [T; 2]) -> Self {
        Self::try_from_hw(hw).unwrap()
    }

    pub fn h(&self) -> T {
        self.h
    }

    pub fn w(&self) -> T {
        self.w
    }

    pub fn area(&self) -> T {
        self.h * self.w
    }

    /// The larger of the two extents.
    pub fn long_side(&self) -> T {
        if self.h >= self.w {
            self.h
        } else {
            self.w
        }
    }
}
