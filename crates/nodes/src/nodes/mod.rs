//! Built-in generation nodes, one module per service family.

mod imagen;
mod lyria;
mod tryon;
mod tts;
mod veo;

pub use imagen::ImagenNode;
pub use lyria::LyriaNode;
pub use tryon::TryOnNode;
pub use tts::TtsNode;
pub use veo::{VeoImageNode, VeoReferencesNode, VeoTextNode};
