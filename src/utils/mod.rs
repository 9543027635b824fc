pub mod extract;
pub mod hash;
pub mod html;
pub mod jwt;
