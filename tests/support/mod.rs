//! Synthetic ELF byte buffers for the black-box scenario tests. Written
//! with plain little-endian field writes rather than `elfedit`'s own
//! codec, so a codec bug can't hide a fixture bug behind it.

pub mod fixture;
