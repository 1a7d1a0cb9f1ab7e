use thiserror::Error;

pub type RoutingResult<T> = Result<T, RoutingError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoutingError {
    #[error("port {0} is already bound")]
    PortAlreadyBound(u16),

    #[error("port {0} is reserved for dummy traffic")]
    PortReserved(u16),
}
