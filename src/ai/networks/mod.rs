mod q_network;

pub use q_network::{QNetwork, QNetworkConfig, QNetworkRecord};
