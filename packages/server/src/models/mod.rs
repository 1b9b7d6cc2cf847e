pub mod auth;
pub mod calificacion;
pub mod comentario;
pub mod favorito;
pub mod material;
pub mod shared;
