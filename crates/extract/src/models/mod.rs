mod dimensions;
mod duration;
mod extraction;
mod kind;

pub use self::dimensions::Dimensions;
pub use self::duration::MediaDuration;
pub use self::extraction::Extraction;
pub use self::kind::MediaKind;
