//! Link layer: the backend's MQTT wire formats and the queues that carry
//! them to and from the control loop.  Transport-agnostic: the firmware's
//! MQTT client only moves bytes.

pub mod channels;
pub mod codec;
