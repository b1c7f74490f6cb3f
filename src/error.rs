use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("configuration error")]
    Config,
    #[display("catalog error")]
    Catalog,
    #[display("library error")]
    Library,
    #[display("invalid argument: {_0}")]
    InvalidArgument(#[error(not(source))] String),
}
