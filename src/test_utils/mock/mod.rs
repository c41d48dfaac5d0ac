mod mock_apollo;
mod mock_server;

pub(crate) use mock_apollo::*;
pub(crate) use mock_server::*;
