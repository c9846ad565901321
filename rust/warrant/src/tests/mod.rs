mod did;
