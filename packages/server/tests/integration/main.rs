mod common;

mod calificacion;
mod comentario;
mod favorito;
mod material;
