// Application-facing ports: the seams between pipeline stages and their
// external collaborators (HTTP source, object store, warehouse).

pub mod ports;
