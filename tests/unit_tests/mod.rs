mod assembly_matrix;
mod block_system;
