pub mod codec;
pub mod endpoint;
pub mod job;
pub mod rpc;
pub mod task;
pub mod wordcount;

pub use codec::KeyValue;
pub use job::{JobInfo, JobPhase};
pub use rpc::{
    Ack, IntermediateLocationsRequest, IntermediateLocationsResponse,
    RegisterIntermediateRequest, TaskCompleteRequest, TaskReply, TaskRequest, WorkerId,
};
pub use task::{Epoch, Task, TaskDescriptor, TaskId, TaskKind, TaskStatus};

/// Función map de la aplicación: (nombre de archivo, contenido) -> registros.
pub type MapFn = fn(&str, &str) -> Vec<KeyValue>;

/// Función reduce de la aplicación: (clave, valores) -> valor de salida.
pub type ReduceFn = fn(&str, &[String]) -> String;
