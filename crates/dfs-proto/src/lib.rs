pub mod name_service {
    tonic::include_proto!("name_service");
}

pub mod chunk_transport {
    tonic::include_proto!("chunk_transport");
}

pub mod job {
    tonic::include_proto!("job");
}
